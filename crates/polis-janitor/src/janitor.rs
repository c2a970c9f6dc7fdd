//! Core Janitor implementation for status refresh

use crate::{JanitorConfig, JanitorError, JanitorMetrics};
use chrono::NaiveDate;
use polis_domain::traits::PolicyStore;
use polis_domain::{derive_status, PolicyId, PolicyStatus, StoredPolicy};
use std::time::Instant;

/// One policy whose stored status no longer matches its dates
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    /// Policy that changed
    pub policy_id: PolicyId,

    /// Its policy number, for reporting
    pub policy_number: String,

    /// Status before the sweep
    pub from: PolicyStatus,

    /// Status derived for the sweep's reference day
    pub to: PolicyStatus,
}

/// Outcome of a single sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Policies examined
    pub checked: usize,

    /// Policies whose status changed (or would have, in dry-run mode)
    pub changes: Vec<StatusChange>,

    /// Whether the changes were left unwritten
    pub dry_run: bool,
}

impl SweepReport {
    /// Number of status changes found
    pub fn changed(&self) -> usize {
        self.changes.len()
    }
}

/// Janitor service for automated status refresh
///
/// Responsible for:
/// - Re-deriving each stored policy's status for a reference day
/// - Writing back the statuses that changed
/// - Collecting metrics on transitions
///
/// # Examples
///
/// ```no_run
/// use chrono::NaiveDate;
/// use polis_janitor::{Janitor, JanitorConfig};
/// use polis_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::new(":memory:")?;
/// let mut janitor = Janitor::new(JanitorConfig::default());
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// janitor.sweep(&mut store, today)?;
/// println!("{}", janitor.metrics().summary());
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    metrics: JanitorMetrics,
}

impl Janitor {
    /// Create a new Janitor with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self {
            config,
            metrics: JanitorMetrics::new(),
        }
    }

    /// Create a Janitor with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Perform a complete sweep as of `today`
    ///
    /// Every stored policy has its status re-derived from its expiration and
    /// effective dates. Policies whose status changed are written through
    /// [`PolicyStore::update_status`] unless the janitor runs in dry-run mode.
    pub fn sweep<S: PolicyStore>(&mut self, store: &mut S, today: NaiveDate) -> Result<SweepReport, JanitorError>
    where
        S::Error: std::fmt::Display,
    {
        let start = Instant::now();

        let policies = store
            .list_policies(None)
            .map_err(|e| JanitorError::Store(format!("Failed to list policies: {}", e)))?;

        let mut report = SweepReport {
            checked: policies.len(),
            changes: Vec::new(),
            dry_run: self.config.dry_run,
        };

        for stored in &policies {
            let Some(change) = stale_status(stored, today) else {
                continue;
            };

            if self.config.dry_run {
                tracing::info!(
                    "[DRY RUN] Would move policy {} from {} to {}",
                    change.policy_number,
                    change.from,
                    change.to
                );
                self.metrics.record_skipped_write();
            } else {
                store.update_status(change.policy_id, change.to).map_err(|e| {
                    JanitorError::Store(format!("Failed to update status of {}: {}", change.policy_id, e))
                })?;
                tracing::debug!("Policy {} moved from {} to {}", change.policy_number, change.from, change.to);
            }

            self.metrics.record_transition(change.to);
            report.changes.push(change);
        }

        self.metrics.record_checked(report.checked);
        self.metrics.record_sweep();
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        tracing::info!(
            "Status sweep for {} checked {} policies, {} changed{}",
            today,
            report.checked,
            report.changed(),
            if report.dry_run { " (dry run)" } else { "" }
        );

        Ok(report)
    }
}

fn stale_status(stored: &StoredPolicy, today: NaiveDate) -> Option<StatusChange> {
    let fields = &stored.policy.fields;
    let derived = derive_status(fields.expiration_date, fields.effective_date, today);
    if derived == stored.policy.status {
        return None;
    }
    Some(StatusChange {
        policy_id: stored.id,
        policy_number: fields.policy_number.clone(),
        from: stored.policy.status,
        to: derived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use polis_domain::{
        CanonicalPolicy, ExtractionConfidence, OwnerId, PolicyAggregate, PolicyFields, VehicleInfo,
    };
    use polis_store::SqliteStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(number: &str, expiration: Option<NaiveDate>, status: PolicyStatus) -> PolicyAggregate {
        PolicyAggregate {
            policy: CanonicalPolicy {
                owner: OwnerId::parse("user-1").unwrap(),
                fields: PolicyFields {
                    insured_name: Some("Ana".to_string()),
                    insurer_name: Some("GNP".to_string()),
                    policy_number: number.to_string(),
                    policy_number_synthesized: false,
                    policy_type: None,
                    premium: None,
                    monthly_amount: None,
                    effective_date: None,
                    expiration_date: expiration,
                    installment_count: None,
                    deductible: None,
                    document_number: None,
                    document_kind: None,
                    vehicle: VehicleInfo::default(),
                    broker_name: None,
                    source_file: None,
                    extracted_at: Utc::now(),
                    confidence: ExtractionConfidence::High,
                },
                status,
            },
            installments: Vec::new(),
            coverage_lines: Vec::new(),
        }
    }

    fn seeded_store() -> (SqliteStore, PolicyId, PolicyId, PolicyId) {
        let mut store = SqliteStore::new(":memory:").unwrap();
        // Saved as current on 2025-01-01; by 2025-01-15 these have moved on.
        let expiring = store
            .save_aggregate(&policy("A-1", Some(date(2025, 1, 30)), PolicyStatus::Current))
            .unwrap();
        let expired = store
            .save_aggregate(&policy("A-2", Some(date(2025, 1, 10)), PolicyStatus::Expiring))
            .unwrap();
        let unchanged = store
            .save_aggregate(&policy("A-3", Some(date(2025, 6, 1)), PolicyStatus::Current))
            .unwrap();
        (store, expiring, expired, unchanged)
    }

    #[test]
    fn test_janitor_creation() {
        let janitor = Janitor::default_config();
        assert_eq!(janitor.metrics().sweep_count, 0);
        assert!(!janitor.config().dry_run);
    }

    #[test]
    fn test_sweep_writes_changed_statuses() {
        let (mut store, expiring, expired, unchanged) = seeded_store();
        let mut janitor = Janitor::default_config();

        let report = janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();

        assert_eq!(report.checked, 3);
        assert_eq!(report.changed(), 2);
        assert!(!report.dry_run);

        let status_of = |id| store.get_policy(id).unwrap().unwrap().policy.status;
        assert_eq!(status_of(expiring), PolicyStatus::Expiring);
        assert_eq!(status_of(expired), PolicyStatus::Expired);
        assert_eq!(status_of(unchanged), PolicyStatus::Current);

        let metrics = janitor.metrics();
        assert_eq!(metrics.transitions_to(PolicyStatus::Expiring), 1);
        assert_eq!(metrics.transitions_to(PolicyStatus::Expired), 1);
        assert_eq!(metrics.policies_checked, 3);
        assert_eq!(metrics.sweep_count, 1);
    }

    #[test]
    fn test_second_sweep_is_a_no_op() {
        let (mut store, ..) = seeded_store();
        let mut janitor = Janitor::default_config();

        janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();
        let report = janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();

        assert_eq!(report.changed(), 0);
        assert_eq!(janitor.metrics().total_transitions(), 2);
        assert_eq!(janitor.metrics().sweep_count, 2);
    }

    #[test]
    fn test_dry_run_reports_without_writing() {
        let (mut store, expiring, ..) = seeded_store();
        let mut janitor = Janitor::new(JanitorConfig::preview());

        let report = janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.changed(), 2);
        let change = report.changes.iter().find(|c| c.policy_id == expiring).unwrap();
        assert_eq!(change.from, PolicyStatus::Current);
        assert_eq!(change.to, PolicyStatus::Expiring);
        assert_eq!(change.policy_number, "A-1");

        assert_eq!(
            store.get_policy(expiring).unwrap().unwrap().policy.status,
            PolicyStatus::Current
        );
        assert_eq!(janitor.metrics().skipped_writes, 2);
    }

    #[test]
    fn test_long_lapsed_policy_is_superseded() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let id = store
            .save_aggregate(&policy("OLD-1", Some(date(2024, 12, 1)), PolicyStatus::Expired))
            .unwrap();

        let mut janitor = Janitor::default_config();
        janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();

        assert_eq!(
            store.get_policy(id).unwrap().unwrap().policy.status,
            PolicyStatus::Superseded
        );
    }

    #[test]
    fn test_policy_without_expiration_stays_current() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.save_aggregate(&policy("OPEN-1", None, PolicyStatus::Current)).unwrap();

        let mut janitor = Janitor::default_config();
        let report = janitor.sweep(&mut store, date(2030, 1, 1)).unwrap();
        assert_eq!(report.changed(), 0);
    }

    #[test]
    fn test_empty_store() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let mut janitor = Janitor::default_config();

        let report = janitor.sweep(&mut store, date(2025, 1, 15)).unwrap();
        assert_eq!(report.checked, 0);
        assert_eq!(janitor.metrics().sweep_count, 1);
    }
}
