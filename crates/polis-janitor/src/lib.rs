//! Polis Janitor - Status Refresh Service
//!
//! A policy's status is derived from its validity dates relative to today, so
//! a stored status goes stale as the calendar moves on. The Janitor re-derives
//! it for every stored policy and writes back the ones that changed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          JanitorWorker                  │
//! │  (interval ticker, Ctrl+C shutdown)     │
//! └──────────────┬──────────────────────────┘
//!                │
//!                ▼
//! ┌─────────────────────────────────────────┐
//! │           Janitor                       │
//! │  list → derive_status → update_status   │
//! └──────────────┬──────────────────────────┘
//!                │
//!                ▼
//!          PolicyStore port
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use chrono::Local;
//! use polis_janitor::{Janitor, JanitorConfig};
//! use polis_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::new("polis.db")?;
//! let mut janitor = Janitor::new(JanitorConfig::default());
//!
//! let report = janitor.sweep(&mut store, Local::now().date_naive())?;
//! println!("{} of {} policies changed status", report.changed(), report.checked);
//! # Ok(())
//! # }
//! ```
//!
//! Dry-run mode reports the transitions a sweep would make without writing
//! anything, which is what `polis refresh --dry-run` uses.

#![warn(missing_docs)]

mod config;
mod error;
mod janitor;
mod metrics;
mod worker;

pub use config::JanitorConfig;
pub use error::JanitorError;
pub use janitor::{Janitor, StatusChange, SweepReport};
pub use metrics::JanitorMetrics;
pub use worker::JanitorWorker;
