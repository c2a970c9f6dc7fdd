//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{CanonicalPolicy, CoverageLine, Installment, OwnerId, PolicyAggregate, PolicyId, PolicyStatus, StoredPolicy};

/// Trait for storing and retrieving policy aggregates
///
/// Implemented by the infrastructure layer (polis-store). The natural key of a
/// policy is `(owner, policy_number)`; implementations should enforce it with a
/// uniqueness constraint so concurrent batches cannot create two rows for it.
pub trait PolicyStore {
    /// Error type for store operations
    type Error;

    /// Look up a policy by its natural key
    fn find_policy_by_natural_key(
        &self,
        owner: &OwnerId,
        policy_number: &str,
    ) -> Result<Option<PolicyId>, Self::Error>;

    /// Insert the policy, or replace the scalar fields of the one sharing its natural key
    fn upsert_policy(&mut self, policy: &CanonicalPolicy) -> Result<PolicyId, Self::Error>;

    /// Replace the whole payment schedule of a policy
    fn replace_installments(&mut self, id: PolicyId, installments: &[Installment]) -> Result<(), Self::Error>;

    /// Replace all coverage lines of a policy
    fn replace_coverage_lines(&mut self, id: PolicyId, lines: &[CoverageLine]) -> Result<(), Self::Error>;

    /// Write a policy and its children as one unit
    ///
    /// The default applies the three writes in order. Stores that can do so
    /// should override it so a crash leaves either the old or the new state.
    fn save_aggregate(&mut self, aggregate: &PolicyAggregate) -> Result<PolicyId, Self::Error> {
        let id = self.upsert_policy(&aggregate.policy)?;
        self.replace_installments(id, &aggregate.installments)?;
        self.replace_coverage_lines(id, &aggregate.coverage_lines)?;
        Ok(id)
    }

    /// Get a policy by ID
    fn get_policy(&self, id: PolicyId) -> Result<Option<StoredPolicy>, Self::Error>;

    /// List stored policies, optionally restricted to one owner
    fn list_policies(&self, owner: Option<&OwnerId>) -> Result<Vec<StoredPolicy>, Self::Error>;

    /// Payment schedule of a policy, ordered by sequence
    fn installments(&self, id: PolicyId) -> Result<Vec<Installment>, Self::Error>;

    /// Coverage lines of a policy
    fn coverage_lines(&self, id: PolicyId) -> Result<Vec<CoverageLine>, Self::Error>;

    /// Overwrite the derived status of a policy
    fn update_status(&mut self, id: PolicyId, status: PolicyStatus) -> Result<(), Self::Error>;
}

/// Trait for mapping an email address to the account that owns it
///
/// Implemented by the infrastructure layer (polis-store) or by test fakes.
pub trait IdentityDirectory {
    /// Error type for directory lookups
    type Error;

    /// Find the owner registered under `email`
    fn find_owner_by_email(&self, email: &str) -> Result<Option<OwnerId>, Self::Error>;
}
