//! Configuration management commands.

use std::io::Write;
use std::path::Path;

use clap::Args;
use keyfolder_core::config::Config;
use keyfolder_core::paths;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (dot-separated path)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command against `config_path`, or the default path.
pub fn run<W: Write>(args: &ConfigArgs, config_path: Option<&Path>, out: &mut W) -> anyhow::Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => paths::config_file()?,
    };

    match &args.command {
        ConfigCommand::Show => {
            let config = Config::load_or_default(Some(&path))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
        }

        ConfigCommand::Get { key } => {
            let config = Config::load_or_default(Some(&path))?;
            let json = serde_json::to_value(&config)?;

            match get_path(&json, key) {
                Some(v) => writeln!(out, "{}", serde_json::to_string_pretty(v)?)?,
                None => anyhow::bail!("Key not found: {}", key),
            }
        }

        ConfigCommand::Set { key, value } => {
            // Only the file's contents are persisted, not environment overrides.
            let config = load_file_or_default(&path)?;
            let mut json = serde_json::to_value(&config)?;
            set_path(&mut json, key, value);

            let updated: Config = serde_json::from_value(json)
                .map_err(|e| anyhow::anyhow!("Invalid configuration after set: {}", e))?;
            updated.validate()?;
            updated.save(&path)?;

            writeln!(out, "Set {} = {}", key, value)?;
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {:?}. Use --force to overwrite.",
                    path
                );
            }

            Config::default_with_folder().save(&path)?;
            writeln!(out, "Created config file: {:?}", path)?;
        }

        ConfigCommand::Path => {
            writeln!(out, "{}", path.display())?;
        }

        ConfigCommand::Validate => {
            let config = Config::load(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            match config.validate() {
                Ok(()) => writeln!(out, "Configuration is valid")?,
                Err(e) => anyhow::bail!("Configuration error: {}", e),
            }
        }
    }

    Ok(())
}

fn load_file_or_default(path: &Path) -> anyhow::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(keyfolder_core::ConfigError::NotFound(_)) => Ok(Config::default_with_folder()),
        Err(e) => Err(e.into()),
    }
}

/// Walk a dot-separated key path through a JSON value.
fn get_path<'a>(json: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    key.split('.').try_fold(json, |acc, k| acc.get(k))
}

/// Set a dot-separated key path, creating intermediate objects as needed.
///
/// The value is parsed as JSON first (numbers, bools, null), falling back to
/// a plain string.
fn set_path(json: &mut serde_json::Value, key: &str, value: &str) {
    let parts: Vec<&str> = key.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        if i == parts.len() - 1 {
            let parsed: serde_json::Value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            current[part] = parsed;
        } else {
            if !current.get(part).map_or(false, |v| v.is_object()) {
                current[part] = serde_json::json!({});
            }
            current = &mut current[part];
        }
    }
}
