//! Config save/load roundtrip integration tests.

use std::path::Path;
use std::time::Duration;

use keyfolder_core::config::Config;
use keyfolder_secrets::UnlockOptions;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keyfolder.json5");

    let mut config = Config::default_with_folder();
    config.app_folder = "MyApp".to_string();
    config.bus.address = Some("unix:path=/run/user/1000/bus".to_string());
    config.unlock.prompt_timeout_secs = Some(90);
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_unlock_options_from_loaded_config() {
    let config = Config::parse(r#"{ unlock: { prompt_timeout_secs: 12, window_id: "wl:3" } }"#)
        .unwrap();
    let options = UnlockOptions::from(&config.unlock);

    assert_eq!(options.prompt_timeout, Some(Duration::from_secs(12)));
    assert_eq!(options.window_id, "wl:3");
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/keyfolder.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
