//! Configuration for Janitor operations
//!
//! Defines how often stored statuses are refreshed and whether changes are
//! written.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Janitor service
///
/// # Examples
///
/// ```
/// use polis_janitor::JanitorConfig;
///
/// // Default configuration (daily refresh)
/// let config = JanitorConfig::default();
/// assert_eq!(config.sweep_interval_minutes, 1440);
///
/// // Hourly refresh
/// let config = JanitorConfig::hourly();
/// assert_eq!(config.sweep_interval_minutes, 60);
///
/// // Report transitions without writing them
/// let config = JanitorConfig::preview();
/// assert!(config.dry_run);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    /// How often to run the sweep cycle (in minutes)
    /// Default: once a day, since status only changes at day granularity
    pub sweep_interval_minutes: u64,

    /// Dry-run mode: log the transitions a sweep would make without writing them
    /// Default: false
    pub dry_run: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: 24 * 60,
            dry_run: false,
        }
    }
}

impl JanitorConfig {
    /// Refresh every hour
    ///
    /// Useful for deployments where the process may be down across midnight.
    pub fn hourly() -> Self {
        Self {
            sweep_interval_minutes: 60,
            ..Self::default()
        }
    }

    /// Default interval, dry-run enabled
    pub fn preview() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_minutes == 0 {
            return Err("sweep_interval_minutes must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
