//! Configuration for the Batch Orchestrator

use polis_extraction::{http::DEFAULT_TIMEOUT_SECS, MAX_BATCH_FILES};
use polis_normalizer::NormalizerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Batch Orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum files accepted in one batch
    pub max_batch_files: usize,

    /// Maximum time for the extraction call (seconds)
    pub extraction_timeout_secs: u64,

    /// Delay before a finished file's status is dropped from the tracker (seconds)
    pub status_clear_delay_secs: u64,

    /// Normalization rules
    pub normalizer: NormalizerConfig,
}

impl PipelineConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Get the status clear delay as a Duration
    pub fn status_clear_delay(&self) -> Duration {
        Duration::from_secs(self.status_clear_delay_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_files == 0 {
            return Err("max_batch_files must be greater than 0".to_string());
        }
        if self.max_batch_files > MAX_BATCH_FILES {
            return Err(format!("max_batch_files cannot exceed {}", MAX_BATCH_FILES));
        }
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        self.normalizer.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_batch_files: MAX_BATCH_FILES,
            extraction_timeout_secs: DEFAULT_TIMEOUT_SECS,
            status_clear_delay_secs: 5,
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Strict preset: only complete, recognized records are persisted
    pub fn strict() -> Self {
        Self {
            normalizer: NormalizerConfig::strict(),
            ..Self::default()
        }
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
