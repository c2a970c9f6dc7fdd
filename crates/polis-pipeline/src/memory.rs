//! In-memory implementations of the storage ports
//!
//! Used by tests and by callers that want to dry-run a batch without a
//! database.

use polis_domain::traits::{IdentityDirectory, PolicyStore};
use polis_domain::{CanonicalPolicy, CoverageLine, Installment, OwnerId, PolicyId, PolicyStatus, StoredPolicy};
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced by the in-memory ports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    /// Policy not found
    #[error("Policy not found: {0}")]
    NotFound(PolicyId),

    /// Scripted failure
    #[error("{0}")]
    Injected(String),
}

/// Policy store backed by plain collections
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: Vec<StoredPolicy>,
    installments: HashMap<PolicyId, Vec<Installment>>,
    coverage_lines: HashMap<PolicyId, Vec<CoverageLine>>,
    fail_policy_number: Option<String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write of the policy with this number
    pub fn failing_on(mut self, policy_number: impl Into<String>) -> Self {
        self.fail_policy_number = Some(policy_number.into());
        self
    }

    /// Number of stored policies
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyStore for MemoryStore {
    type Error = MemoryError;

    fn find_policy_by_natural_key(&self, owner: &OwnerId, policy_number: &str) -> Result<Option<PolicyId>, Self::Error> {
        Ok(self
            .policies
            .iter()
            .find(|p| p.policy.owner == *owner && p.policy.policy_number() == policy_number)
            .map(|p| p.id))
    }

    fn upsert_policy(&mut self, policy: &CanonicalPolicy) -> Result<PolicyId, Self::Error> {
        if self.fail_policy_number.as_deref() == Some(policy.policy_number()) {
            return Err(MemoryError::Injected(format!("write rejected for {}", policy.policy_number())));
        }

        if let Some(existing) = self
            .policies
            .iter_mut()
            .find(|p| p.policy.owner == policy.owner && p.policy.policy_number() == policy.policy_number())
        {
            existing.policy = policy.clone();
            return Ok(existing.id);
        }

        let id = PolicyId::new();
        self.policies.push(StoredPolicy {
            id,
            policy: policy.clone(),
        });
        Ok(id)
    }

    fn replace_installments(&mut self, id: PolicyId, installments: &[Installment]) -> Result<(), Self::Error> {
        if !self.policies.iter().any(|p| p.id == id) {
            return Err(MemoryError::NotFound(id));
        }
        self.installments.insert(id, installments.to_vec());
        Ok(())
    }

    fn replace_coverage_lines(&mut self, id: PolicyId, lines: &[CoverageLine]) -> Result<(), Self::Error> {
        if !self.policies.iter().any(|p| p.id == id) {
            return Err(MemoryError::NotFound(id));
        }
        self.coverage_lines.insert(id, lines.to_vec());
        Ok(())
    }

    fn get_policy(&self, id: PolicyId) -> Result<Option<StoredPolicy>, Self::Error> {
        Ok(self.policies.iter().find(|p| p.id == id).cloned())
    }

    fn list_policies(&self, owner: Option<&OwnerId>) -> Result<Vec<StoredPolicy>, Self::Error> {
        Ok(self
            .policies
            .iter()
            .filter(|p| owner.map_or(true, |o| p.policy.owner == *o))
            .cloned()
            .collect())
    }

    fn installments(&self, id: PolicyId) -> Result<Vec<Installment>, Self::Error> {
        Ok(self.installments.get(&id).cloned().unwrap_or_default())
    }

    fn coverage_lines(&self, id: PolicyId) -> Result<Vec<CoverageLine>, Self::Error> {
        Ok(self.coverage_lines.get(&id).cloned().unwrap_or_default())
    }

    fn update_status(&mut self, id: PolicyId, status: PolicyStatus) -> Result<(), Self::Error> {
        let stored = self
            .policies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(MemoryError::NotFound(id))?;
        stored.policy.status = status;
        Ok(())
    }
}

/// Email directory backed by a map
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    accounts: HashMap<String, OwnerId>,
    failure: Option<String>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; blank owners are ignored
    pub fn with_account(mut self, email: &str, owner: &str) -> Self {
        if let Some(owner) = OwnerId::parse(owner) {
            self.accounts.insert(email.trim().to_lowercase(), owner);
        }
        self
    }

    /// Fail every lookup with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl IdentityDirectory for MemoryDirectory {
    type Error = MemoryError;

    fn find_owner_by_email(&self, email: &str) -> Result<Option<OwnerId>, Self::Error> {
        if let Some(message) = &self.failure {
            return Err(MemoryError::Injected(message.clone()));
        }
        Ok(self.accounts.get(&email.trim().to_lowercase()).cloned())
    }
}
