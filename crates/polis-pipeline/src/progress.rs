//! Per-file progress tracking
//!
//! Each submitted file moves through
//! `queued → uploading → processing → completed | failed`.
//! Progress only ever grows within a batch, and finished entries are dropped
//! after the configured delay.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle state of one submitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Waiting for the batch to start
    Queued,
    /// Being sent to the extraction service
    Uploading,
    /// Records are being normalized and saved
    Processing,
    /// Every record from the file was saved
    Completed,
    /// The file produced no usable policy
    Failed,
}

impl FileState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Completed | FileState::Failed)
    }

    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Queued => "queued",
            FileState::Uploading => "uploading",
            FileState::Processing => "processing",
            FileState::Completed => "completed",
            FileState::Failed => "failed",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live status of one submitted file
#[derive(Debug, Clone, PartialEq)]
pub struct FileProcessingStatus {
    /// Batch the file belongs to
    pub batch_id: u64,

    /// Position of the file within its batch
    pub index: usize,

    /// Original file name
    pub file_name: String,

    /// Percentage complete, 0-100
    pub progress: u8,

    /// Lifecycle state
    pub state: FileState,

    /// Human-readable detail
    pub message: String,
}

/// Receives every status change, in order
///
/// Called synchronously from the processing loop; implementations should
/// return quickly.
pub trait ProgressListener: Send + Sync {
    /// A file's status changed
    fn on_progress(&self, status: &FileProcessingStatus);
}

type Key = (u64, usize);

#[derive(Default)]
struct TrackerState {
    entries: BTreeMap<Key, FileProcessingStatus>,
    listeners: Vec<Arc<dyn ProgressListener>>,
}

/// Table of live file statuses shared between the orchestrator and observers
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<TrackerState>>,
    next_batch: Arc<AtomicU64>,
    clear_delay: Duration,
}

impl ProgressTracker {
    /// Create a tracker dropping finished entries after `clear_delay`
    pub fn new(clear_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState::default())),
            next_batch: Arc::new(AtomicU64::new(1)),
            clear_delay,
        }
    }

    /// Register a listener for all future changes
    pub fn add_listener(&self, listener: Arc<dyn ProgressListener>) {
        if let Ok(mut state) = self.state.lock() {
            state.listeners.push(listener);
        }
    }

    /// Queue every file of a new batch and return the batch id
    pub fn start_batch(&self, file_names: &[String]) -> u64 {
        let batch_id = self.next_batch.fetch_add(1, Ordering::Relaxed);
        for (index, file_name) in file_names.iter().enumerate() {
            let status = FileProcessingStatus {
                batch_id,
                index,
                file_name: file_name.clone(),
                progress: 0,
                state: FileState::Queued,
                message: "Queued".to_string(),
            };
            self.publish((batch_id, index), |entries| {
                entries.insert((batch_id, index), status.clone());
                Some(status)
            });
        }
        batch_id
    }

    /// Move a file to `state`
    ///
    /// Progress never decreases and finished entries are not touched again.
    /// Returns the status as published, or `None` when nothing changed.
    pub fn update(
        &self,
        batch_id: u64,
        index: usize,
        state: FileState,
        progress: u8,
        message: impl Into<String>,
    ) -> Option<FileProcessingStatus> {
        let message = message.into();
        let key = (batch_id, index);

        let published = self.publish(key, |entries| {
            let entry = entries.get_mut(&key)?;
            if entry.state.is_terminal() {
                return None;
            }
            entry.state = state;
            entry.progress = entry.progress.max(progress.min(100));
            entry.message = message;
            Some(entry.clone())
        });

        if let Some(status) = &published {
            if status.state.is_terminal() {
                self.schedule_clear(key);
            }
        }
        published
    }

    /// Statuses of every tracked file
    pub fn snapshot(&self) -> Vec<FileProcessingStatus> {
        self.state
            .lock()
            .map(|state| state.entries.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Statuses of the files of one batch
    pub fn batch_snapshot(&self, batch_id: u64) -> Vec<FileProcessingStatus> {
        self.state
            .lock()
            .map(|state| {
                state
                    .entries
                    .range((batch_id, 0)..(batch_id + 1, 0))
                    .map(|(_, status)| status.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply `change` under the lock, then notify listeners outside it
    fn publish<F>(&self, key: Key, change: F) -> Option<FileProcessingStatus>
    where
        F: FnOnce(&mut BTreeMap<Key, FileProcessingStatus>) -> Option<FileProcessingStatus>,
    {
        let (status, listeners) = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(e) => {
                    warn!("Progress tracker lock poisoned for {:?}: {}", key, e);
                    return None;
                }
            };
            let status = change(&mut state.entries)?;
            (status, state.listeners.clone())
        };

        for listener in &listeners {
            listener.on_progress(&status);
        }
        Some(status)
    }

    fn schedule_clear(&self, key: Key) {
        let state = Arc::clone(&self.state);
        let delay = self.clear_delay;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Ok(mut state) = state.lock() {
                        state.entries.remove(&key);
                    }
                    debug!("Cleared status of file {} in batch {}", key.1, key.0);
                });
            }
            Err(_) => debug!("No runtime available; status of batch {} kept", key.0),
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
