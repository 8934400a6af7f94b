//! Item commands.
//!
//! Provides `keyfolder list|get|set|update|info|status|delete`, backed by
//! [`SecretStorage`] on the configured Secret Service.

use std::io::Write;

use anyhow::Context;
use keyfolder_core::Config;
use keyfolder_secrets::{KeyedStore, SecretBus, SecretError, SecretStorage, UnlockOutcome};
use tracing::debug;

use crate::Commands;

/// An item command with its secret value already resolved.
#[derive(Debug, PartialEq, Eq)]
pub enum ItemAction {
    List,
    Get { key: String },
    Set { key: String, value: String, replace: bool },
    Update { key: String, value: String },
    Info { key: String },
    Status,
    Delete { key: String },
}

impl ItemAction {
    /// Convert a parsed command, prompting for any value not given on the
    /// command line.
    pub fn from_command(command: Commands) -> anyhow::Result<Self> {
        Ok(match command {
            Commands::List => Self::List,
            Commands::Get { key } => Self::Get { key },
            Commands::Set {
                key,
                value,
                no_replace,
            } => {
                let value = secret_value(&key, value)?;
                Self::Set {
                    key,
                    value,
                    replace: !no_replace,
                }
            }
            Commands::Update { key, value } => {
                let value = secret_value(&key, value)?;
                Self::Update { key, value }
            }
            Commands::Info { key } => Self::Info { key },
            Commands::Status => Self::Status,
            Commands::Delete { key } => Self::Delete { key },
            Commands::Config(_) | Commands::Version => {
                anyhow::bail!("not an item command")
            }
        })
    }
}

fn secret_value(key: &str, value: Option<String>) -> anyhow::Result<String> {
    let value = match value {
        Some(v) => v,
        None => rpassword::prompt_password(format!("Enter value for '{key}': "))
            .context("Failed to read secret")?,
    };

    if value.is_empty() {
        anyhow::bail!("Secret value must not be empty");
    }
    Ok(value)
}

/// Connect to the Secret Service described by `config` and run `action`.
pub async fn run<W: Write>(config: &Config, action: ItemAction, out: &mut W) -> anyhow::Result<()> {
    debug!(
        folder = %config.app_folder,
        address = config.bus.address.as_deref().unwrap_or("session"),
        "connecting to secret service"
    );
    let storage = SecretStorage::open(config)
        .await
        .context("Failed to connect to the Secret Service")?;

    let result = execute(&storage, action, out).await;
    storage.close();
    result
}

/// Run `action` against an already connected storage handle.
pub async fn execute<B: SecretBus, W: Write>(
    storage: &SecretStorage<B>,
    action: ItemAction,
    out: &mut W,
) -> anyhow::Result<()> {
    let folder = storage.app_folder().unwrap_or_default();

    match action {
        ItemAction::List => {
            let keys = storage.list_keys().await?;
            if keys.is_empty() {
                writeln!(out, "No keys stored in '{folder}'.")?;
            } else {
                for key in &keys {
                    writeln!(out, "{key}")?;
                }
            }
        }

        // Raw bytes, so binary secrets survive a redirect to a file.
        ItemAction::Get { key } => match storage.get(&key).await? {
            Some(secret) => {
                out.write_all(secret.expose())?;
                out.write_all(b"\n")?;
            }
            None => anyhow::bail!("No secret stored under '{key}' in '{folder}'"),
        },

        ItemAction::Set {
            key,
            value,
            replace,
        } => match storage.create(&key, value.as_bytes(), replace).await {
            Ok(()) => writeln!(out, "Secret '{key}' stored in '{folder}'.")?,
            Err(SecretError::Conflict { .. }) => {
                anyhow::bail!("Key '{key}' already exists in '{folder}'; drop --no-replace to overwrite it")
            }
            Err(e) => return Err(e.into()),
        },

        ItemAction::Update { key, value } => {
            if !storage.update(&key, value.as_bytes()).await? {
                anyhow::bail!("No secret stored under '{key}' in '{folder}'");
            }
            writeln!(out, "Secret '{key}' updated.")?;
        }

        ItemAction::Info { key } => match storage.item_info(&key).await? {
            Some(info) => {
                writeln!(out, "{:<10} {}", "KEY", info.key)?;
                writeln!(out, "{:<10} {}", "LABEL", info.label)?;
                writeln!(out, "{:<10} {}", "PATH", info.path)?;
                writeln!(out, "{:<10} {}", "LOCKED", info.locked)?;
                writeln!(out, "{:<10} {}", "CREATED", info.created)?;
                writeln!(out, "{:<10} {}", "MODIFIED", info.modified)?;
            }
            None => anyhow::bail!("No secret stored under '{key}' in '{folder}'"),
        },

        ItemAction::Status => {
            let collection = storage.collection_info().await?;
            let unlock = match storage.unlock_outcome() {
                Some(UnlockOutcome::Immediate) => "unlocked without prompt",
                Some(UnlockOutcome::Prompted { dismissed: false }) => "unlocked by prompt",
                Some(UnlockOutcome::Prompted { dismissed: true }) => "prompt dismissed",
                None => "-",
            };
            writeln!(out, "{:<11} {}", "FOLDER", folder)?;
            writeln!(out, "{:<11} {}", "COLLECTION", collection.label)?;
            writeln!(out, "{:<11} {}", "LOCKED", collection.locked)?;
            writeln!(out, "{:<11} {}", "ITEMS", collection.items.len())?;
            writeln!(out, "{:<11} {}", "UNLOCK", unlock)?;
        }

        ItemAction::Delete { key } => {
            if storage.delete(&key).await? {
                writeln!(out, "Secret '{key}' deleted.")?;
            } else {
                writeln!(out, "No secret stored under '{key}'; nothing deleted.")?;
            }
        }
    }

    Ok(())
}
