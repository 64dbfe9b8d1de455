//! Data models for the Collect Data plugin

pub mod configuration;
pub mod data;
pub mod execution;
pub mod plugin;

pub use configuration::*;
pub use data::*;
pub use execution::*;
pub use plugin::*;
