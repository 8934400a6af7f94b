//! CLI routing through the library entry points.

use std::sync::Arc;

use clap::Parser;
use keyfolder_cli::commands::items::{execute, ItemAction};
use keyfolder_cli::{Cli, Commands};
use keyfolder_integration_tests::connected;
use keyfolder_secrets::MemorySecretBus;
use tempfile::TempDir;

#[test]
fn test_unknown_command_rejected() {
    assert!(Cli::try_parse_from(["keyfolder", "nonexistent-command"]).is_err());
}

#[test]
fn test_help_lists_item_commands() {
    let err = Cli::try_parse_from(["keyfolder", "--help"])
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
    for command in ["list", "get", "set", "delete", "config"] {
        assert!(err.contains(command), "help should mention '{command}': {err}");
    }
}

#[tokio::test]
async fn test_parsed_commands_drive_store() {
    let bus = Arc::new(MemorySecretBus::new());
    let storage = connected(&bus, "Routed").await;

    let commands = [
        vec!["keyfolder", "set", "api", "--value", "s3cret"],
        vec!["keyfolder", "set", "db", "--value", "pw"],
        vec!["keyfolder", "delete", "db"],
        vec!["keyfolder", "list"],
        vec!["keyfolder", "get", "api"],
    ];

    let mut out = Vec::new();
    for argv in commands {
        let cli = Cli::try_parse_from(argv).unwrap();
        let action = ItemAction::from_command(cli.command).unwrap();
        execute(&storage, action, &mut out).await.unwrap();
    }

    let printed = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = printed.lines().collect();
    assert_eq!(lines[lines.len() - 2], "api");
    assert_eq!(lines[lines.len() - 1], "s3cret");
}

#[tokio::test]
async fn test_config_commands_use_override_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cli.json5");
    let path_arg = path.to_str().unwrap();

    for argv in [
        vec!["keyfolder", "-c", path_arg, "config", "init"],
        vec!["keyfolder", "-c", path_arg, "config", "set", "app_folder", "FromCli"],
        vec!["keyfolder", "-c", path_arg, "config", "validate"],
    ] {
        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(matches!(cli.command, Commands::Config(_)));
        keyfolder_cli::run(cli).await.unwrap();
    }

    let config = keyfolder_core::Config::load(&path).unwrap();
    assert_eq!(config.app_folder, "FromCli");
}
