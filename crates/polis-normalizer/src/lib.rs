//! Polis Normalizer
//!
//! Turns untrusted extraction records into policy drafts.
//!
//! The normalizer provides:
//! - Shape recognition (flat, structured, unrecognized)
//! - Field alias resolution and type coercion
//! - Coercion warnings instead of errors for lossy reads
//! - Placeholder policy numbers for records without one
//!
//! Nothing is invented: a field absent from the record stays absent on the
//! draft.
//!
//! # Examples
//!
//! ```no_run
//! use polis_normalizer::{Normalizer, NormalizerConfig};
//! use polis_extraction::ExtractedRecord;
//!
//! let normalizer = Normalizer::new(NormalizerConfig::default());
//! let record = ExtractedRecord::new(serde_json::json!({"aseguradora": "GNP"}));
//! let normalized = normalizer.normalize(&record, Some("gnp.pdf"), chrono::Utc::now());
//! ```

#![warn(missing_docs)]

mod coerce;
mod config;
mod error;
mod normalizer;
mod shape;

pub use coerce::CoercionWarning;
pub use config::NormalizerConfig;
pub use error::NormalizeError;
pub use normalizer::{Normalized, Normalizer};
pub use shape::ShapeKind;
