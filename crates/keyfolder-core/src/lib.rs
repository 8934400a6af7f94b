//! # keyfolder-core
//!
//! Configuration, path resolution, and shared error types for keyfolder.
//!
//! - **Configuration**: loading, validation, and persistence of the json5 config file
//! - **Paths**: resolution of the keyfolder home directory and config file
//! - **Environment**: typed access to `KEYFOLDER_*` overrides

pub mod config;
pub mod env;
pub mod error;
pub mod paths;

pub use config::Config;
pub use error::ConfigError;
