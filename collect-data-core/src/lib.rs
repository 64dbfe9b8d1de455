//! # Collect Data Core Library
//!
//! Shared core functionality for the Collect Data runner plugin: the wire
//! protocol spoken with the runner, the step lifecycle reporter, the backend
//! client and the action that ties them together.

pub mod client;
pub mod executor;
pub mod models;
pub mod protocol;
pub mod reporter;
pub mod server;
pub mod services;
