//! Keyed store behaviour against the in-memory Secret Service.

use std::collections::HashSet;
use std::sync::Arc;

use keyfolder_integration_tests::connected;
use keyfolder_secrets::attributes::attributes_for;
use keyfolder_secrets::bus::SecretBus;
use keyfolder_secrets::{KeyedStore, MemorySecretBus, SecretError};

#[tokio::test]
async fn test_round_trip_arbitrary_bytes() {
    let bus = Arc::new(MemorySecretBus::new());
    let store = connected(&bus, "RoundTrip").await;

    let values: [&[u8]; 4] = [b"", b"plain text", &[0, 159, 146, 150], "ключ".as_bytes()];
    for (i, value) in values.iter().enumerate() {
        let key = format!("key-{i}");
        store.create(&key, value, true).await.unwrap();
        let got = store.get(&key).await.unwrap().unwrap();
        assert_eq!(got.expose(), *value, "value for {key}");
    }
}

#[tokio::test]
async fn test_overwrite_leaves_single_item() {
    let bus = Arc::new(MemorySecretBus::new());
    let store = connected(&bus, "App").await;

    store.create("k", b"v1", true).await.unwrap();
    store.create("k", b"v2", true).await.unwrap();

    assert_eq!(store.get("k").await.unwrap().unwrap().expose(), b"v2");
    let matches = bus
        .search_items(&attributes_for("App", Some("k")))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn test_conflict_keeps_first_value() {
    let bus = Arc::new(MemorySecretBus::new());
    let store = connected(&bus, "App").await;

    store.create("k", b"v1", false).await.unwrap();
    let err = store.create("k", b"v2", false).await.unwrap_err();

    match err {
        SecretError::Conflict { folder, key } => {
            assert_eq!(folder, "App");
            assert_eq!(key, "k");
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(store.get("k").await.unwrap().unwrap().expose(), b"v1");
}

#[tokio::test]
async fn test_delete_then_get_is_absent() {
    let bus = Arc::new(MemorySecretBus::new());
    let store = connected(&bus, "App").await;

    store.create("k", b"v", true).await.unwrap();
    assert!(store.delete("k").await.unwrap());
    assert!(store.get("k").await.unwrap().is_none());
    assert!(!store.delete("k").await.unwrap());
}

#[tokio::test]
async fn test_delete_never_created() {
    let bus = Arc::new(MemorySecretBus::new());
    let store = connected(&bus, "App").await;
    assert!(!store.delete("never-created").await.unwrap());
}

#[tokio::test]
async fn test_enumeration_per_folder() {
    let bus = Arc::new(MemorySecretBus::new());
    let first = connected(&bus, "F").await;
    let second = connected(&bus, "F2").await;

    first.create("a", b"v", true).await.unwrap();
    first.create("b", b"v", true).await.unwrap();

    let keys: HashSet<String> = first.list_keys().await.unwrap().into_iter().collect();
    assert_eq!(keys, HashSet::from(["a".to_string(), "b".to_string()]));
    assert!(second.list_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_folder_isolation_with_same_key() {
    let bus = Arc::new(MemorySecretBus::new());
    let mine = connected(&bus, "Mine").await;
    let theirs = connected(&bus, "Theirs").await;

    mine.create("shared", b"mine", true).await.unwrap();
    assert!(theirs.get("shared").await.unwrap().is_none());
    assert!(!theirs.delete("shared").await.unwrap());

    theirs.create("shared", b"theirs", true).await.unwrap();
    assert_eq!(mine.get("shared").await.unwrap().unwrap().expose(), b"mine");
    assert_eq!(theirs.get("shared").await.unwrap().unwrap().expose(), b"theirs");
    assert_eq!(bus.item_count(), 2);
}

#[tokio::test]
async fn test_keyed_store_trait_object() {
    let bus = Arc::new(MemorySecretBus::new());
    let store: Box<dyn KeyedStore> = Box::new(connected(&bus, "Dyn").await);

    store.create("k", b"v", true).await.unwrap();
    assert_eq!(store.list_keys().await.unwrap(), vec!["k".to_string()]);
    assert!(store.delete("k").await.unwrap());
}
