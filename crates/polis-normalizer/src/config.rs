//! Normalizer configuration

use serde::{Deserialize, Serialize};

/// Configuration for normalization rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Replace a missing policy number with a placeholder instead of rejecting the record
    pub synthesize_missing_policy_number: bool,

    /// Keep records matching no known shape as low-confidence drafts
    pub allow_unrecognized_shape: bool,

    /// Prefix of synthesized policy numbers
    pub placeholder_prefix: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            synthesize_missing_policy_number: true,
            allow_unrecognized_shape: true,
            placeholder_prefix: "PEND".to_string(),
        }
    }
}

impl NormalizerConfig {
    /// Create a strict configuration (only complete, recognized records pass)
    pub fn strict() -> Self {
        Self {
            synthesize_missing_policy_number: false,
            allow_unrecognized_shape: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.placeholder_prefix.trim().is_empty() {
            return Err("placeholder_prefix must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NormalizerConfig::default();
        assert!(config.synthesize_missing_policy_number);
        assert!(config.allow_unrecognized_shape);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = NormalizerConfig::strict();
        assert!(!config.synthesize_missing_policy_number);
        assert!(!config.allow_unrecognized_shape);
        assert_eq!(config.placeholder_prefix, "PEND");
    }

    #[test]
    fn test_blank_prefix_is_invalid() {
        let mut config = NormalizerConfig::default();
        config.placeholder_prefix = " ".to_string();
        assert!(config.validate().is_err());
    }
}
