//! Connecting through a locked collection.

use std::sync::Arc;
use std::time::Duration;

use keyfolder_secrets::store::ConnectionPhase;
use keyfolder_secrets::{
    KeyedStore, MemorySecretBus, PromptBehaviour, SecretError, SecretStorage, UnlockOptions,
    UnlockOutcome,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_prompt_completes_and_store_works() {
    let bus = Arc::new(MemorySecretBus::locked(PromptBehaviour::Complete));
    let storage = SecretStorage::new(Arc::clone(&bus)).with_unlock_options(UnlockOptions {
        prompt_timeout: None,
        window_id: "x11:7".to_string(),
    });

    storage.connect("Locked").await.unwrap();

    assert!(!bus.is_locked());
    assert_eq!(bus.calls().show_prompt, 1);
    assert_eq!(bus.last_window_id().as_deref(), Some("x11:7"));

    storage.create("k", b"v", true).await.unwrap();
    assert_eq!(storage.get("k").await.unwrap().unwrap().expose(), b"v");
}

#[tokio::test]
async fn test_dismissed_prompt_still_connects() {
    let bus = Arc::new(MemorySecretBus::locked(PromptBehaviour::Dismiss));
    let storage = SecretStorage::new(Arc::clone(&bus));

    storage.connect("Locked").await.unwrap();
    assert_eq!(storage.phase(), ConnectionPhase::Ready);
    assert_eq!(
        storage.unlock_outcome(),
        Some(UnlockOutcome::Prompted { dismissed: true })
    );
    assert!(storage.collection_info().await.unwrap().locked);

    // The collection stayed locked, so secret calls fail at the service.
    let result = storage.create("k", b"v", true).await;
    assert!(matches!(result, Err(SecretError::Transport(_))));
}

#[tokio::test]
async fn test_prompt_completed_externally() {
    let bus = Arc::new(MemorySecretBus::locked(PromptBehaviour::Hold));
    let storage = SecretStorage::new(Arc::clone(&bus));

    let release = {
        let bus = Arc::clone(&bus);
        async move {
            while bus.calls().show_prompt == 0 {
                tokio::task::yield_now().await;
            }
            bus.complete_pending_prompts(false)
        }
    };

    let (connected, released) = tokio::join!(storage.connect("Held"), release);
    connected.unwrap();
    assert_eq!(released, 1);
    assert!(!bus.is_locked());
}

#[tokio::test(start_paused = true)]
async fn test_prompt_timeout_leaves_disconnected() {
    let bus = Arc::new(MemorySecretBus::locked(PromptBehaviour::Hold));
    let storage = SecretStorage::new(Arc::clone(&bus)).with_unlock_options(UnlockOptions {
        prompt_timeout: Some(Duration::from_secs(5)),
        window_id: String::new(),
    });

    let result = storage.connect("Held").await;
    assert!(matches!(result, Err(SecretError::PromptTimeout(_))));
    assert_eq!(storage.phase(), ConnectionPhase::Disconnected);
    assert!(matches!(storage.get("k").await, Err(SecretError::NotConnected)));
}

#[tokio::test]
async fn test_cancellation_token_aborts_item_operations() {
    let bus = Arc::new(MemorySecretBus::new());
    let token = CancellationToken::new();
    let storage = SecretStorage::new(bus).with_cancellation(token.clone());
    storage.connect("App").await.unwrap();

    token.cancel();
    assert!(matches!(storage.list_keys().await, Err(SecretError::Cancelled)));
    assert_eq!(storage.phase(), ConnectionPhase::Closed);
    assert!(matches!(storage.list_keys().await, Err(SecretError::Closed)));
}

#[tokio::test]
async fn test_retry_after_cancelled_prompt() {
    let bus = Arc::new(MemorySecretBus::locked(PromptBehaviour::Hold));
    let storage = SecretStorage::new(Arc::clone(&bus));
    let attempt = CancellationToken::new();

    let cancel = {
        let bus = Arc::clone(&bus);
        let attempt = attempt.clone();
        async move {
            while bus.calls().show_prompt == 0 {
                tokio::task::yield_now().await;
            }
            attempt.cancel();
        }
    };

    let (first, ()) = tokio::join!(storage.connect_with_cancellation("App", &attempt), cancel);
    assert!(matches!(first, Err(SecretError::Cancelled)));
    assert_eq!(storage.phase(), ConnectionPhase::Disconnected);
    assert!(matches!(storage.list_keys().await, Err(SecretError::NotConnected)));

    // The user unlocked the keyring some other way before the retry.
    bus.set_locked(false);
    storage.connect("App").await.unwrap();

    storage.create("k", b"v", true).await.unwrap();
    assert_eq!(storage.list_keys().await.unwrap(), vec!["k".to_string()]);
    assert_eq!(bus.calls().open_session, 2);
}
