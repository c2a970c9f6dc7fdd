//! Request and result types for batch processing

use crate::identity::IdentitySource;
use crate::progress::{FileProcessingStatus, FileState};
use crate::RecordError;
use polis_domain::{CanonicalPolicy, PolicyId};
use polis_extraction::SourceDocument;
use polis_normalizer::{CoercionWarning, ShapeKind};

/// Request to process one batch of documents
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Documents to extract, in submission order
    pub files: Vec<SourceDocument>,

    /// Identity of the authenticated caller, if any
    pub caller_identity: Option<String>,

    /// Email the caller supplied, used for directory lookup
    pub caller_email: Option<String>,
}

impl BatchRequest {
    /// Create a request without caller context
    pub fn new(files: Vec<SourceDocument>) -> Self {
        Self {
            files,
            caller_identity: None,
            caller_email: None,
        }
    }

    /// Attach the caller's identity
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.caller_identity = Some(identity.into());
        self
    }

    /// Attach the caller's email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.caller_email = Some(email.into());
        self
    }
}

/// Result of processing a batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Policies written, in record order
    pub policies: Vec<PersistedPolicy>,

    /// Records that could not be processed
    pub failures: Vec<RecordFailure>,

    /// Natural-key matches that turned into updates
    pub duplicates: Vec<DuplicateEvent>,

    /// Final status of every submitted file
    pub file_statuses: Vec<FileProcessingStatus>,

    /// Number of records persisted
    pub succeeded: usize,

    /// Number of records that failed
    pub failed: usize,
}

impl BatchResult {
    /// Number of files that ended in `completed`
    pub fn files_completed(&self) -> usize {
        self.file_statuses.iter().filter(|s| s.state == FileState::Completed).count()
    }

    /// Number of files that ended in `failed`
    pub fn files_failed(&self) -> usize {
        self.file_statuses.iter().filter(|s| s.state == FileState::Failed).count()
    }
}

/// A policy written during the batch
#[derive(Debug, Clone)]
pub struct PersistedPolicy {
    /// Surrogate key
    pub id: PolicyId,

    /// What was written
    pub policy: CanonicalPolicy,

    /// Whether an existing policy was replaced
    pub is_update: bool,

    /// Number of installments written
    pub installment_count: usize,

    /// Number of coverage lines written
    pub coverage_line_count: usize,

    /// Which strategy supplied the owner
    pub identity_source: IdentitySource,

    /// Layout the record arrived in
    pub shape: ShapeKind,

    /// Low-confidence coercions made while normalizing
    pub warnings: Vec<CoercionWarning>,
}

/// A record that failed, and why
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    /// Position of the record in the extraction response
    pub record_index: usize,

    /// File the record was attributed to
    pub file_name: String,

    /// What went wrong
    pub error: RecordError,
}

/// Raised when a submitted policy already existed under the same natural key
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateEvent {
    /// Policy number shared by both submissions
    pub policy_number: String,

    /// Row that was updated
    pub existing_id: PolicyId,

    /// Name to show the user
    pub display_name: String,
}
