//! Metrics collection for Janitor operations

use polis_domain::PolicyStatus;
use std::collections::HashMap;

/// Metrics collected across Janitor sweeps
///
/// Tracks how many policies were checked and how many moved into each status.
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Transitions per destination status
    pub transitions: HashMap<PolicyStatus, usize>,

    /// Policies examined across all sweeps
    pub policies_checked: usize,

    /// Transitions found but not written because of dry-run mode
    pub skipped_writes: usize,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a policy moving into `to`
    pub fn record_transition(&mut self, to: PolicyStatus) {
        *self.transitions.entry(to).or_insert(0) += 1;
    }

    /// Record policies examined in a sweep
    pub fn record_checked(&mut self, count: usize) {
        self.policies_checked += count;
    }

    /// Record a transition that dry-run mode did not write
    pub fn record_skipped_write(&mut self) {
        self.skipped_writes += 1;
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Transitions into one status
    pub fn transitions_to(&self, status: PolicyStatus) -> usize {
        self.transitions.get(&status).copied().unwrap_or(0)
    }

    /// Get total transitions across all statuses
    pub fn total_transitions(&self) -> usize {
        self.transitions.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.transitions.clear();
        self.policies_checked = 0;
        self.skipped_writes = 0;
        self.sweep_count = 0;
        self.total_runtime_ms = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Policies checked: {}", self.policies_checked),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.transitions.is_empty() {
            lines.push("Transitions into status:".to_string());
            for status in PolicyStatus::all() {
                if let Some(count) = self.transitions.get(&status) {
                    lines.push(format!("  {}: {}", status, count));
                }
            }
            lines.push(format!("  Total: {}", self.total_transitions()));
        }

        if self.skipped_writes > 0 {
            lines.push(format!("Not written (dry run): {}", self.skipped_writes));
        }

        lines.join("\n")
    }
}
