//! Normalizer error types

use thiserror::Error;

/// Errors that can occur during normalization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// Record is structurally unusable
    #[error("Invalid record: {}", .0.join("; "))]
    InvalidRecord(Vec<String>),
}

impl NormalizeError {
    /// Reasons the record was rejected
    pub fn reasons(&self) -> &[String] {
        match self {
            NormalizeError::InvalidRecord(reasons) => reasons,
        }
    }
}
