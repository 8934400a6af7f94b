//! Core types for keyed secret storage.
//!
//! Remote objects are addressed by D-Bus object paths; their metadata is
//! mirrored into plain structs so callers never handle `zvariant` values.

use std::collections::HashMap;
use std::fmt;

use zeroize::Zeroizing;
use zvariant::OwnedObjectPath;

/// A secret value read back from the service.
///
/// The buffer is zeroed on drop. Debug and Display both emit `[REDACTED]` to
/// prevent accidental logging.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    inner: Zeroizing<Vec<u8>>,
}

impl SecretValue {
    /// Wrap raw secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Zeroizing::new(bytes.into()),
        }
    }

    /// Expose the raw bytes. Use sparingly.
    pub fn expose(&self) -> &[u8] {
        &self.inner
    }

    /// Expose the value as UTF-8, if it is valid UTF-8.
    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.inner).ok()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<Vec<u8>> for SecretValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Property set of an `org.freedesktop.Secret.Item`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemProperties {
    pub locked: bool,
    pub attributes: HashMap<String, String>,
    pub label: String,
    pub item_type: String,
    /// Seconds since the Unix epoch.
    pub created: u64,
    /// Seconds since the Unix epoch.
    pub modified: u64,
}

/// Property set of an `org.freedesktop.Secret.Collection`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionProperties {
    pub items: Vec<OwnedObjectPath>,
    pub label: String,
    pub locked: bool,
    pub created: u64,
    pub modified: u64,
}

/// Metadata about a stored key, without its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    /// Object path of the backing item.
    pub path: String,
    /// The key this item is stored under.
    pub key: String,
    /// Display label (`<folder>/<key>` for items written by this crate).
    pub label: String,
    pub locked: bool,
    pub created: u64,
    pub modified: u64,
}

/// Payload of a prompt's `Completed` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptCompletion {
    /// True when the user dismissed the prompt instead of completing it.
    pub dismissed: bool,
}
