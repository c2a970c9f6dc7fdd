//! Policy module - the canonical policy aggregate and its draft form

use crate::{CoverageLine, Installment, OwnerId, PolicyId, PolicyStatus};
use chrono::{DateTime, NaiveDate, Utc};

/// How much the normalizer trusts the shape a record arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionConfidence {
    /// Record matched a known shape
    High,

    /// Record matched no known shape; only minimal data was kept
    Low,
}

impl ExtractionConfidence {
    /// Get the confidence name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionConfidence::High => "high",
            ExtractionConfidence::Low => "low",
        }
    }

    /// Parse a confidence from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(ExtractionConfidence::High),
            "low" => Some(ExtractionConfidence::Low),
            _ => None,
        }
    }
}

/// Vehicle or insured-asset details carried by auto policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleInfo {
    /// Make/model description
    pub model: Option<String>,

    /// License plate
    pub plate: Option<String>,

    /// Model year
    pub year: Option<i32>,
}

impl VehicleInfo {
    /// True when no vehicle field was extracted
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.plate.is_none() && self.year.is_none()
    }
}

/// Every canonical field the normalizer can populate
///
/// All fields are optional except the policy number: a missing one is replaced
/// by a placeholder and flagged through `policy_number_synthesized`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyFields {
    /// Name of the insured party
    pub insured_name: Option<String>,

    /// Name of the insurance carrier
    pub insurer_name: Option<String>,

    /// Carrier's policy number (or a placeholder)
    pub policy_number: String,

    /// Whether `policy_number` was synthesized because none was extracted
    pub policy_number_synthesized: bool,

    /// Line of business (auto, health, life, ...)
    pub policy_type: Option<String>,

    /// Total premium
    pub premium: Option<f64>,

    /// Amount charged per installment
    pub monthly_amount: Option<f64>,

    /// Start of validity
    pub effective_date: Option<NaiveDate>,

    /// End of validity
    pub expiration_date: Option<NaiveDate>,

    /// Number of payment installments
    pub installment_count: Option<u32>,

    /// Deductible amount
    pub deductible: Option<f64>,

    /// Document number printed on the policy
    pub document_number: Option<String>,

    /// Kind of document (policy, endorsement, renewal, ...)
    pub document_kind: Option<String>,

    /// Vehicle/asset details
    pub vehicle: VehicleInfo,

    /// Broker or agency that placed the policy
    pub broker_name: Option<String>,

    /// File the record was extracted from
    pub source_file: Option<String>,

    /// When the extraction happened
    pub extracted_at: DateTime<Utc>,

    /// Shape confidence
    pub confidence: ExtractionConfidence,
}

/// A normalized policy not yet bound to an owner
///
/// Produced by the normalizer; the pipeline attaches the resolved owner and
/// the derived status through [`PolicyDraft::into_policy`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDraft {
    /// Canonical fields
    pub fields: PolicyFields,

    /// Coverage lines found in the record
    pub coverage_lines: Vec<CoverageLine>,
}

impl PolicyDraft {
    /// Bind the draft to its owner and status
    pub fn into_policy(self, owner: OwnerId, status: PolicyStatus) -> (CanonicalPolicy, Vec<CoverageLine>) {
        (
            CanonicalPolicy {
                owner,
                fields: self.fields,
                status,
            },
            self.coverage_lines,
        )
    }
}

/// A fully normalized policy, the aggregate root persisted by a `PolicyStore`
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPolicy {
    /// Owning account; never empty
    pub owner: OwnerId,

    /// Canonical fields
    pub fields: PolicyFields,

    /// Derived lifecycle status
    pub status: PolicyStatus,
}

impl CanonicalPolicy {
    /// Policy number (natural key component)
    pub fn policy_number(&self) -> &str {
        &self.fields.policy_number
    }

    /// Name shown to users when referring to this policy
    ///
    /// Falls back from insured name to insurer name to source file to the
    /// policy number itself.
    pub fn display_name(&self) -> String {
        self.fields
            .insured_name
            .clone()
            .or_else(|| self.fields.insurer_name.clone())
            .or_else(|| self.fields.source_file.clone())
            .unwrap_or_else(|| self.fields.policy_number.clone())
    }
}

/// A policy together with its children, written as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAggregate {
    /// Aggregate root
    pub policy: CanonicalPolicy,

    /// Payment schedule
    pub installments: Vec<Installment>,

    /// Coverage lines
    pub coverage_lines: Vec<CoverageLine>,
}

/// A policy as read back from a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPolicy {
    /// Surrogate key
    pub id: PolicyId,

    /// Stored policy
    pub policy: CanonicalPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_fields() -> PolicyFields {
        PolicyFields {
            insured_name: None,
            insurer_name: None,
            policy_number: "POL-1".to_string(),
            policy_number_synthesized: false,
            policy_type: None,
            premium: None,
            monthly_amount: None,
            effective_date: None,
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
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        let owner = OwnerId::parse("owner-1").unwrap();
        let mut policy = CanonicalPolicy {
            owner,
            fields: sample_fields(),
            status: PolicyStatus::Current,
        };
        assert_eq!(policy.display_name(), "POL-1");

        policy.fields.source_file = Some("scan.pdf".to_string());
        assert_eq!(policy.display_name(), "scan.pdf");

        policy.fields.insurer_name = Some("Acme Seguros".to_string());
        assert_eq!(policy.display_name(), "Acme Seguros");

        policy.fields.insured_name = Some("Maria Lopez".to_string());
        assert_eq!(policy.display_name(), "Maria Lopez");
    }

    #[test]
    fn test_draft_into_policy_keeps_fields() {
        let draft = PolicyDraft {
            fields: sample_fields(),
            coverage_lines: vec![CoverageLine::new("Civil liability", Some(500_000.0))],
        };
        let (policy, lines) = draft.into_policy(OwnerId::parse("o").unwrap(), PolicyStatus::Expired);
        assert_eq!(policy.policy_number(), "POL-1");
        assert_eq!(policy.status, PolicyStatus::Expired);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_confidence_names() {
        assert_eq!(ExtractionConfidence::parse("low"), Some(ExtractionConfidence::Low));
        assert_eq!(ExtractionConfidence::High.as_str(), "high");
        assert_eq!(ExtractionConfidence::parse("medium"), None);
    }
}
