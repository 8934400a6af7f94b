//! Keyed secret storage on top of the freedesktop Secret Service.
//!
//! Items in the default collection are tagged with an application folder and
//! a key, and [`SecretStorage`] exposes them as a simple key-value store. The
//! D-Bus surface sits behind the [`SecretBus`] trait so the store can run
//! against a live service ([`DbusSecretBus`]) or in memory
//! ([`MemorySecretBus`]).

pub mod attributes;
pub mod bus;
pub mod codec;
pub mod dbus;
pub mod error;
pub mod memory;
pub mod session;
pub mod store;
pub mod types;
pub mod unlock;

pub use bus::SecretBus;
pub use dbus::DbusSecretBus;
pub use error::{Result, SecretError};
pub use memory::{MemorySecretBus, PromptBehaviour};
pub use store::{ConnectionPhase, KeyedStore, SecretStorage};
pub use types::{ItemInfo, SecretValue};
pub use unlock::{UnlockOptions, UnlockOutcome};
