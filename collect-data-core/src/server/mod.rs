//! Plugin protocol server

pub mod core;

pub use self::core::*;
