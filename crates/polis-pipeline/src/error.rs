//! Error types for the pipeline

use polis_extraction::ExtractionError;
use polis_normalizer::NormalizeError;
use thiserror::Error;

/// Errors that abort a whole batch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The single extraction call failed; no record could be processed
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors confined to one record; the batch carries on without it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// No caller identity, embedded identity or directory match
    #[error("Could not determine which account owns this policy")]
    UnresolvedIdentity,

    /// Record is structurally unusable
    #[error("{0}")]
    InvalidRecord(#[from] NormalizeError),

    /// Identity directory lookup failed
    #[error("Account lookup failed: {0}")]
    Directory(String),

    /// Writing the policy failed
    #[error("Could not save policy: {0}")]
    Persistence(String),
}
