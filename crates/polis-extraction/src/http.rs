//! HTTP Extraction Client Implementation
//!
//! Sends a whole batch of documents to the extraction service in a single
//! multipart request, so total latency is bounded by one round trip.
//!
//! # Request
//!
//! | Field | Content |
//! |-------|---------|
//! | `file1`..`fileN` | document bytes, with the original file name |
//! | `timestamp` | RFC 3339 batch submission time |
//! | `totalFiles` | N, as a decimal string |
//! | `userId` | optional owner hint |
//!
//! # Examples
//!
//! ```no_run
//! use polis_extraction::HttpExtractionClient;
//! use std::time::Duration;
//!
//! let client = HttpExtractionClient::new("http://localhost:5678/webhook/extract")
//!     .unwrap()
//!     .with_timeout(Duration::from_secs(120));
//! ```

use crate::{check_batch_size, parse_response, ExtractedRecord, ExtractionClient, ExtractionError, SourceDocument, MAX_BATCH_FILES};
use async_trait::async_trait;
use chrono::Utc;
use polis_domain::OwnerId;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for one extraction call (10 minutes)
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Extraction client talking to the service over HTTP
pub struct HttpExtractionClient {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
    max_files: usize,
}

impl HttpExtractionClient {
    /// Create a client for `endpoint` with the default timeout and batch limit
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ExtractionError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_files: MAX_BATCH_FILES,
        })
    }

    /// Set the hard timeout for one extraction call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Lower the batch limit (it can never exceed [`MAX_BATCH_FILES`])
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files.min(MAX_BATCH_FILES);
        self
    }

    /// Endpoint this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(files: &[SourceDocument], owner_hint: Option<&OwnerId>) -> Result<Form, ExtractionError> {
        let mut form = Form::new()
            .text("timestamp", Utc::now().to_rfc3339())
            .text("totalFiles", files.len().to_string());

        if let Some(owner) = owner_hint {
            form = form.text("userId", owner.to_string());
        }

        for (idx, doc) in files.iter().enumerate() {
            let part = Part::bytes(doc.content.clone())
                .file_name(doc.file_name.clone())
                .mime_str(mime_for(&doc.file_name))
                .map_err(|e| ExtractionError::Communication(format!("Invalid part for {}: {}", doc.file_name, e)))?;
            form = form.part(format!("file{}", idx + 1), part);
        }

        Ok(form)
    }

    async fn post(&self, form: Form) -> Result<String, ExtractionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        if !status.is_success() {
            return Err(ExtractionError::Communication(format!("HTTP {}: {}", status, body)));
        }

        Ok(body)
    }
}

#[async_trait]
impl ExtractionClient for HttpExtractionClient {
    async fn extract(
        &self,
        files: &[SourceDocument],
        owner_hint: Option<&OwnerId>,
    ) -> Result<Vec<ExtractedRecord>, ExtractionError> {
        check_batch_size(files.len(), self.max_files)?;

        let form = Self::build_form(files, owner_hint)?;

        info!("Sending {} files to extraction service at {}", files.len(), self.endpoint);

        // Dropping the request future on timeout cancels the in-flight call
        let body = tokio::time::timeout(self.timeout, self.post(form))
            .await
            .map_err(|_| {
                warn!("Extraction call exceeded {:?}", self.timeout);
                ExtractionError::Timeout(self.timeout)
            })??;

        debug!("Extraction response length: {} bytes", body.len());

        let records = parse_response(&body)?;
        info!("Extraction service returned {} records", records.len());
        Ok(records)
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> ExtractionError {
    if e.is_timeout() {
        ExtractionError::Timeout(timeout)
    } else {
        ExtractionError::Communication(format!("Request failed: {}", e))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}
