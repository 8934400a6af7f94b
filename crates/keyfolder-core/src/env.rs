//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a boolean.
pub fn get_bool(name: &str) -> bool {
    get_var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Get an environment variable as a u64.
pub fn get_u64(name: &str) -> Option<u64> {
    get_var(name).and_then(|v| v.trim().parse().ok())
}

/// Environment variable names understood by keyfolder.
pub mod vars {
    /// Keyfolder home directory override.
    pub const KEYFOLDER_HOME: &str = "KEYFOLDER_HOME";

    /// Config file override.
    pub const KEYFOLDER_CONFIG: &str = "KEYFOLDER_CONFIG";

    /// Application folder override.
    pub const KEYFOLDER_APP_FOLDER: &str = "KEYFOLDER_APP_FOLDER";

    /// D-Bus address override (defaults to the session bus).
    pub const KEYFOLDER_BUS_ADDRESS: &str = "KEYFOLDER_BUS_ADDRESS";

    /// Unlock prompt timeout in seconds.
    pub const KEYFOLDER_PROMPT_TIMEOUT_SECS: &str = "KEYFOLDER_PROMPT_TIMEOUT_SECS";

    /// Opt-in switch for tests against a live Secret Service.
    pub const KEYFOLDER_LIVE_DBUS: &str = "KEYFOLDER_LIVE_DBUS";
}
