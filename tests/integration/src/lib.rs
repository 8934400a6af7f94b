//! Shared helpers for the keyfolder integration tests.

use std::sync::Arc;

use keyfolder_secrets::{MemorySecretBus, SecretStorage};

/// A storage handle connected to `folder` on `bus`.
pub async fn connected(bus: &Arc<MemorySecretBus>, folder: &str) -> SecretStorage<MemorySecretBus> {
    let storage = SecretStorage::new(Arc::clone(bus));
    storage
        .connect(folder)
        .await
        .unwrap_or_else(|e| panic!("connect to '{folder}' failed: {e}"));
    storage
}
