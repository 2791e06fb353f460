// ── Host configuration ────────────────────────────────────────────────────────
//
// Reads the optional JSON file named by `CASEMENT_CONFIG`.
// No `unsafe`: pure safe Rust + serde_json.

use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CASEMENT_CONFIG";

/// Process-wide settings for the window host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // forward-compat: missing fields take their defaults
pub struct HostConfig {
    /// Win32 class registered for every host window.
    pub window_class_name: String,
    /// Title used when a creation request carries none.
    pub default_title: String,
    /// Destroy every remaining window when the first window created closes.
    pub quit_on_main_window_close: bool,
    /// Give dialogs a sizing border.
    pub resizable_dialogs: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            window_class_name: "CasementHostWindow".to_owned(),
            default_title: "Casement".to_owned(),
            quit_on_main_window_close: true,
            resizable_dialogs: true,
        }
    }
}

impl HostConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Load from `$CASEMENT_CONFIG`, falling back to defaults when the
    /// variable is unset or the file cannot be read or parsed.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                Self::default()
            }
        }
    }
}

/// Path named by `CASEMENT_CONFIG`, if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = HostConfig::from_json(r#"{"default_title":"Inspector"}"#).expect("parse");
        assert_eq!(config.default_title, "Inspector");
        assert_eq!(config.window_class_name, "CasementHostWindow");
        assert!(config.quit_on_main_window_close);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(HostConfig::from_json("{}").unwrap(), HostConfig::default());
    }

    #[test]
    fn malformed_json_is_an_argument_error() {
        let err = HostConfig::from_json("{ not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn round_trips_through_serde() {
        let config = HostConfig {
            quit_on_main_window_close: false,
            ..HostConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(HostConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let err = HostConfig::load_from(std::path::Path::new("/nonexistent/casement.json"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Platform);
    }
}
