//! Tests against a running Secret Service.
//!
//! Skipped unless `KEYFOLDER_LIVE_DBUS` is set. The collection must already be
//! unlocked or the keyring daemon must be able to show a prompt.

use std::time::Duration;

use keyfolder_core::env::{self, vars};
use keyfolder_core::Config;
use keyfolder_secrets::{KeyedStore, SecretStorage};

fn live_config(test: &str) -> Option<Config> {
    if !env::get_bool(vars::KEYFOLDER_LIVE_DBUS) {
        eprintln!("skipping: {} is not set", vars::KEYFOLDER_LIVE_DBUS);
        return None;
    }
    let mut config = Config::default_with_folder();
    config.app_folder = format!("keyfolder-live-{test}-{}", std::process::id());
    config.bus.address = env::get_var(vars::KEYFOLDER_BUS_ADDRESS);
    config.unlock.prompt_timeout_secs = Some(120);
    Some(config)
}

#[tokio::test]
async fn test_live_round_trip() {
    let Some(config) = live_config("round-trip") else {
        return;
    };
    let storage = SecretStorage::open(&config).await.unwrap();

    storage.create("TestItem", b"TestValue", true).await.unwrap();
    let value = storage.get("TestItem").await.unwrap().unwrap();
    assert_eq!(value.expose(), b"TestValue");

    storage.create("TestItem", b"Replaced", true).await.unwrap();
    assert_eq!(
        storage.get("TestItem").await.unwrap().unwrap().expose(),
        b"Replaced"
    );
    assert_eq!(storage.list_keys().await.unwrap(), vec!["TestItem".to_string()]);

    assert!(storage.delete("TestItem").await.unwrap());
    assert!(storage.get("TestItem").await.unwrap().is_none());
    assert!(!storage.delete("TestItem").await.unwrap());
}

#[tokio::test]
async fn test_live_conflict_and_update() {
    let Some(config) = live_config("conflict") else {
        return;
    };
    let storage = SecretStorage::open(&config).await.unwrap();

    storage.create("conflict", b"one", false).await.unwrap();
    assert!(storage.create("conflict", b"two", false).await.is_err());
    assert!(storage.update("conflict", b"three").await.unwrap());
    assert_eq!(
        storage.get("conflict").await.unwrap().unwrap().expose(),
        b"three"
    );

    let info = storage.item_info("conflict").await.unwrap().unwrap();
    assert_eq!(info.label, format!("{}/conflict", config.app_folder));

    tokio::time::timeout(Duration::from_secs(30), storage.delete("conflict"))
        .await
        .unwrap()
        .unwrap();
}
