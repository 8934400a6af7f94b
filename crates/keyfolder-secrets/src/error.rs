//! Error types for keyed secret storage.

use std::time::Duration;

use keyfolder_core::ConfigError;
use thiserror::Error;

/// Errors that can occur during secret operations.
///
/// Missing keys are not errors: `get` returns `None` and `delete` returns
/// `false`.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Transport error: {0}")]
    Transport(#[from] zbus::Error),

    #[error("Item with key '{key}' in folder '{folder}' already exists; set `replace` to overwrite it")]
    Conflict { folder: String, key: String },

    #[error("Storage is not connected")]
    NotConnected,

    #[error("Storage is already connected")]
    AlreadyConnected,

    #[error("Storage has been closed")]
    Closed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid folder: {0}")]
    InvalidFolder(String),

    #[error("Unlock prompt did not complete within {0:?}")]
    PromptTimeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<zbus::fdo::Error> for SecretError {
    fn from(e: zbus::fdo::Error) -> Self {
        Self::Transport(e.into())
    }
}

impl From<zvariant::Error> for SecretError {
    fn from(e: zvariant::Error) -> Self {
        Self::Transport(e.into())
    }
}

/// Convenience result alias for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;
