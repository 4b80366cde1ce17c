//! Application settings
//!
//! Layered: `config/default` then `config/{RUN_MODE}` then `config/local`
//! then `SERIES_MANAGER__`-prefixed environment variables. Tokens are looked
//! up in the environment first so they never need to live in a checked-in
//! file.

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::reconcile::MessageLimits;

/// Main application settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// IEX Cloud provider configuration
    pub provider: IexSettings,
    /// Local series storage
    pub storage: StorageSettings,
    /// Backfill behavior
    pub backfill: BackfillSettings,
    /// Calendar overrides
    pub calendar: CalendarSettings,
}

/// IEX Cloud settings. Tokens may come from the environment (`IEX_TOKEN`,
/// `IEX_SANDBOX_TOKEN`) instead of a config file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct IexSettings {
    pub token: Option<String>,
    pub sandbox_token: Option<String>,
}

impl IexSettings {
    /// Token for the chosen environment: environment variable first, then
    /// the config file.
    pub fn token_for(&self, sandbox: bool) -> Option<String> {
        if sandbox {
            std::env::var("IEX_SANDBOX_TOKEN")
                .ok()
                .or_else(|| self.sandbox_token.clone())
        } else {
            std::env::var("IEX_TOKEN").ok().or_else(|| self.token.clone())
        }
    }
}

/// Local storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory for series files; sandbox and cloud data live in
    /// separate subdirectories beneath it.
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Backfill behavior settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillSettings {
    /// Prompt before spending messages on a backfill.
    pub require_confirmation: bool,
    /// Message budget limits.
    pub limits: MessageLimits,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            limits: MessageLimits::default(),
        }
    }
}

/// Calendar overrides beyond the builtin holiday and closure tables.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CalendarSettings {
    /// Extra market-closure dates (`YYYY-MM-DD`).
    pub extra_closures: Vec<NaiveDate>,
}

impl Settings {
    /// Load settings from configuration files and environment
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let config_dir = Self::config_dir();

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
            // Add environment-specific configuration
            .add_source(File::with_name(&format!("{config_dir}/{run_mode}")).required(false))
            // Add local overrides (not checked into git)
            .add_source(File::with_name(&format!("{config_dir}/local")).required(false))
            // Add environment variables (e.g., SERIES_MANAGER__STORAGE__DATA_DIR)
            .add_source(
                Environment::with_prefix("SERIES_MANAGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    fn config_dir() -> String {
        std::env::var("SERIES_MANAGER_CONFIG_DIR").unwrap_or_else(|_| "config".into())
    }
}
