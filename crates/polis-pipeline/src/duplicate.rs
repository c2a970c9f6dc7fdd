//! Natural-key duplicate detection

use polis_domain::traits::PolicyStore;
use polis_domain::{PolicyAggregate, PolicyId};
use tracing::debug;

/// Outcome of writing an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    /// Row the aggregate was written to
    pub policy_id: PolicyId,

    /// Whether a policy with the same natural key already existed
    pub is_update: bool,
}

/// Write `aggregate`, replacing any policy with the same `(owner, policy_number)`
///
/// A match has its scalar fields and child collections replaced in place, so
/// submitting the same document twice leaves a single policy behind.
pub fn find_or_insert<S: PolicyStore>(store: &mut S, aggregate: &PolicyAggregate) -> Result<Upsert, S::Error> {
    let policy = &aggregate.policy;
    let existing = store.find_policy_by_natural_key(&policy.owner, policy.policy_number())?;

    let policy_id = store.save_aggregate(aggregate)?;
    if let Some(previous) = existing {
        debug!("Policy {} already stored as {}; replaced", policy.policy_number(), previous);
    }

    Ok(Upsert {
        policy_id,
        is_update: existing.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::{NaiveDate, Utc};
    use polis_domain::{
        CanonicalPolicy, CoverageLine, ExtractionConfidence, OwnerId, PolicyFields, PolicyStatus, VehicleInfo,
    };

    fn aggregate(owner: &str, number: &str, premium: f64, coverages: usize) -> PolicyAggregate {
        PolicyAggregate {
            policy: CanonicalPolicy {
                owner: OwnerId::parse(owner).unwrap(),
                fields: PolicyFields {
                    insured_name: Some("Ana".to_string()),
                    insurer_name: None,
                    policy_number: number.to_string(),
                    policy_number_synthesized: false,
                    policy_type: None,
                    premium: Some(premium),
                    monthly_amount: None,
                    effective_date: NaiveDate::from_ymd_opt(2025, 1, 1),
                    expiration_date: None,
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
                status: PolicyStatus::Current,
            },
            installments: Vec::new(),
            coverage_lines: (0..coverages).map(|i| CoverageLine::new(format!("line {}", i), None)).collect(),
        }
    }

    #[test]
    fn test_first_write_is_insert() {
        let mut store = MemoryStore::new();
        let upsert = find_or_insert(&mut store, &aggregate("user-1", "A-1", 100.0, 2)).unwrap();

        assert!(!upsert.is_update);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_resubmission_updates_in_place() {
        let mut store = MemoryStore::new();
        let first = find_or_insert(&mut store, &aggregate("user-1", "A-1", 100.0, 3)).unwrap();
        let second = find_or_insert(&mut store, &aggregate("user-1", "A-1", 250.0, 1)).unwrap();

        assert!(second.is_update);
        assert_eq!(first.policy_id, second.policy_id);
        assert_eq!(store.len(), 1);

        let stored = store.get_policy(first.policy_id).unwrap().unwrap();
        assert_eq!(stored.policy.fields.premium, Some(250.0));
        assert_eq!(store.coverage_lines(first.policy_id).unwrap().len(), 1);
    }

    #[test]
    fn test_other_owner_is_not_a_duplicate() {
        let mut store = MemoryStore::new();
        find_or_insert(&mut store, &aggregate("user-1", "A-1", 100.0, 0)).unwrap();
        let other = find_or_insert(&mut store, &aggregate("user-2", "A-1", 100.0, 0)).unwrap();

        assert!(!other.is_update);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_errors_propagate() {
        let mut store = MemoryStore::new().failing_on("A-1");
        assert!(find_or_insert(&mut store, &aggregate("user-1", "A-1", 100.0, 0)).is_err());
        assert!(store.is_empty());
    }
}
