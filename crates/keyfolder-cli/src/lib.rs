//! keyfolder command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use keyfolder_core::Config;

/// keyfolder - keyed secrets in the desktop keyring
#[derive(Parser)]
#[command(name = "keyfolder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "KEYFOLDER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Application folder the keys live in
    #[arg(long, global = true)]
    pub folder: Option<String>,

    /// D-Bus address of the Secret Service (defaults to the session bus)
    #[arg(long, global = true)]
    pub address: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List every key in the folder
    List,

    /// Print the secret stored under a key
    Get {
        /// Item key
        key: String,
    },

    /// Store a secret (prompts for the value)
    Set {
        /// Item key
        key: String,

        /// Secret value (if omitted, prompts for hidden input)
        #[arg(long)]
        value: Option<String>,

        /// Fail instead of overwriting an existing key
        #[arg(long)]
        no_replace: bool,
    },

    /// Overwrite the secret of an existing key in place
    Update {
        /// Item key
        key: String,

        /// Secret value (if omitted, prompts for hidden input)
        #[arg(long)]
        value: Option<String>,
    },

    /// Show metadata for a key without printing its secret
    Info {
        /// Item key
        key: String,
    },

    /// Show the state of the default collection
    Status,

    /// Delete the item stored under a key
    Delete {
        /// Item key
        key: String,
    },

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

impl GlobalArgs {
    /// Load the configuration and apply command-line overrides on top.
    pub fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(folder) = &self.folder {
            config.app_folder = folder.clone();
        }
        if let Some(address) = &self.address {
            config.bus.address = Some(address.clone());
        }
        Ok(config)
    }
}

/// Default log filter for the given `-v` count.
pub fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("warn,keyfolder_core={level},keyfolder_secrets={level},keyfolder_cli={level}")
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    match cli.command {
        Commands::Config(args) => {
            commands::config::run(&args, cli.global.config.as_deref(), &mut out)
        }
        Commands::Version => {
            println!("keyfolder {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = cli.global.resolve_config()?;
            let action = commands::items::ItemAction::from_command(command)?;
            commands::items::run(&config, action, &mut out).await
        }
    }
}
