//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Default application folder used when none is configured.
pub const DEFAULT_APP_FOLDER: &str = "keyfolder";

/// Main keyfolder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Folder that namespaces every item created through this configuration.
    #[serde(default = "default_app_folder")]
    pub app_folder: String,

    /// Bus connection settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Collection unlock settings.
    #[serde(default)]
    pub unlock: UnlockConfig,
}

fn default_app_folder() -> String {
    DEFAULT_APP_FOLDER.to_string()
}

/// Bus connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// D-Bus address such as `unix:path=/run/user/1000/bus` or
    /// `tcp:host=localhost,port=7834`. `None` selects the session bus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Collection unlock settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockConfig {
    /// Seconds to wait for an interactive unlock prompt. `None` waits forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_timeout_secs: Option<u64>,

    /// Window identifier handed to the prompt so it can parent its dialog.
    #[serde(default)]
    pub window_id: String,
}
