//! Polis Pipeline
//!
//! Turns batches of policy documents into normalized, deduplicated, persisted
//! policies.
//!
//! # Architecture
//!
//! ```text
//! Files → ExtractionClient → records → {IdentityResolver, Normalizer}
//!       → derive_status → installments → find_or_insert → PolicyStore
//! ```
//!
//! # Key Features
//!
//! - **One extraction call per batch**, bounded by a timeout
//! - **Record isolation**: a bad record fails its file, never the batch
//! - **Ownership resolution** from caller, record, or account directory
//! - **Idempotent re-submission** through natural-key upserts
//! - **Live progress** per file, with listeners and auto-clearing
//!
//! # Example Usage
//!
//! ```no_run
//! use polis_extraction::{MockExtractionClient, SourceDocument};
//! use polis_pipeline::memory::{MemoryDirectory, MemoryStore};
//! use polis_pipeline::{BatchOrchestrator, BatchRequest, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MockExtractionClient::new(r#"[{"numero_poliza": "A-1", "aseguradora": "GNP"}]"#);
//! let orchestrator = BatchOrchestrator::new(
//!     client,
//!     MemoryStore::new(),
//!     MemoryDirectory::new(),
//!     PipelineConfig::default(),
//! );
//!
//! let request = BatchRequest::new(vec![SourceDocument::new("gnp.pdf", Vec::new())])
//!     .with_identity("user-1");
//! let result = orchestrator.process(request).await?;
//!
//! println!("Saved: {} policies", result.succeeded);
//! println!("Updated: {} duplicates", result.duplicates.len());
//! println!("Failures: {} records", result.failed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod duplicate;
mod error;
mod identity;
pub mod memory;
mod orchestrator;
mod progress;
mod types;


pub use config::PipelineConfig;
pub use duplicate::{find_or_insert, Upsert};
pub use error::{PipelineError, RecordError};
pub use identity::{IdentityResolver, IdentitySource, Resolution};
pub use orchestrator::{BatchOrchestrator, NO_POLICY_DATA};
pub use progress::{FileProcessingStatus, FileState, ProgressListener, ProgressTracker};
pub use types::{BatchRequest, BatchResult, DuplicateEvent, PersistedPolicy, RecordFailure};
