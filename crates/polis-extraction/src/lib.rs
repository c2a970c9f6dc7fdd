//! Polis Extraction Client Layer
//!
//! Translation boundary to the external document extraction service.
//!
//! # Architecture
//!
//! This crate defines the `ExtractionClient` trait the pipeline depends on and
//! ships two implementations with a common interface.
//!
//! # Clients
//!
//! - `MockExtractionClient`: Scripted responses for testing, no network
//! - `HttpExtractionClient`: One multipart request per batch to the service
//!
//! A batch carries at most [`MAX_BATCH_FILES`] documents. Whatever the service
//! answers is run through [`parse_response`], which turns empty, malformed or
//! record-less answers into errors instead of empty results.
//!
//! # Examples
//!
//! ```
//! use polis_extraction::{ExtractionClient, MockExtractionClient, SourceDocument};
//!
//! # async fn example() -> Result<(), polis_extraction::ExtractionError> {
//! let client = MockExtractionClient::new(r#"[{"numero_poliza": "A-1"}]"#);
//! let files = vec![SourceDocument::new("policy.pdf", b"%PDF-1.7".to_vec())];
//! let records = client.extract(&files, None).await?;
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod http;
pub mod response;

use async_trait::async_trait;
use polis_domain::OwnerId;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use http::HttpExtractionClient;
pub use response::parse_response;

/// Maximum number of documents accepted in one batch
pub const MAX_BATCH_FILES: usize = 10;

/// Errors that can occur while talking to the extraction service
///
/// Every variant is fatal for the batch that triggered it: no records exist to
/// salvage once the single extraction call has failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Batch larger than the service accepts
    #[error("Batch too large: {count} files (max: {max})")]
    BatchSizeExceeded {
        /// Submitted file count
        count: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Batch with no files at all
    #[error("Batch contains no files")]
    EmptyBatch,

    /// The service did not answer within the timeout
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    /// Network or HTTP-level failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// The service answered with an empty body
    #[error("Extraction service returned an empty response; check the service configuration")]
    EmptyResponse,

    /// The body was not usable JSON
    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),

    /// The service answered with zero records
    #[error("Extraction service returned no policies for the submitted files")]
    NoRecordsReturned,
}

/// A document submitted for extraction
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Original file name
    pub file_name: String,

    /// Raw file bytes
    pub content: Vec<u8>,
}

impl SourceDocument {
    /// Create a document from its name and bytes
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// One untrusted record as returned by the extraction service
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord(Value);

impl ExtractedRecord {
    /// Wrap a raw JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the raw JSON value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Top-level field lookup (None for non-object records)
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unwrap into the raw JSON value
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for ExtractedRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Trait for sending a batch of documents to the extraction service
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Extract raw records from all `files` in a single call
    async fn extract(
        &self,
        files: &[SourceDocument],
        owner_hint: Option<&OwnerId>,
    ) -> Result<Vec<ExtractedRecord>, ExtractionError>;
}

/// Reject empty batches and batches above `max` files
pub fn check_batch_size(count: usize, max: usize) -> Result<(), ExtractionError> {
    if count == 0 {
        return Err(ExtractionError::EmptyBatch);
    }
    if count > max {
        return Err(ExtractionError::BatchSizeExceeded { count, max });
    }
    Ok(())
}

/// What a mock client saw on one call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// File names in submission order
    pub file_names: Vec<String>,

    /// Owner hint passed along, if any
    pub owner_hint: Option<String>,
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Body(String),
    Fail(ExtractionError),
}

/// Mock extraction client for deterministic testing
///
/// Returns a pre-configured body (run through the real response parser) or a
/// pre-configured error without making any network calls.
///
/// # Examples
///
/// ```
/// use polis_extraction::{ExtractionClient, ExtractionError, MockExtractionClient, SourceDocument};
///
/// # async fn example() {
/// let files = vec![SourceDocument::new("a.pdf", Vec::new())];
///
/// let client = MockExtractionClient::new("");
/// assert!(matches!(client.extract(&files, None).await, Err(ExtractionError::EmptyResponse)));
///
/// let client = MockExtractionClient::failing(ExtractionError::Communication("down".into()));
/// assert!(client.extract(&files, None).await.is_err());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockExtractionClient {
    outcome: MockOutcome,
    delay: Option<Duration>,
    max_files: usize,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockExtractionClient {
    /// Create a mock answering every call with `body`
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Body(body.into()),
            delay: None,
            max_files: MAX_BATCH_FILES,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock failing every call with `error`
    pub fn failing(error: ExtractionError) -> Self {
        Self {
            outcome: MockOutcome::Fail(error),
            ..Self::new("")
        }
    }

    /// Sleep for `delay` before answering (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times extract was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    /// Get every call seen so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl Default for MockExtractionClient {
    fn default() -> Self {
        Self::new("[]")
    }
}

#[async_trait]
impl ExtractionClient for MockExtractionClient {
    async fn extract(
        &self,
        files: &[SourceDocument],
        owner_hint: Option<&OwnerId>,
    ) -> Result<Vec<ExtractedRecord>, ExtractionError> {
        check_batch_size(files.len(), self.max_files)?;

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                file_names: files.iter().map(|f| f.file_name.clone()).collect(),
                owner_hint: owner_hint.map(|o| o.to_string()),
            });
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.outcome {
            MockOutcome::Body(body) => parse_response(body),
            MockOutcome::Fail(error) => Err(error.clone()),
        }
    }
}
