//! Record normalization

use crate::coerce::CoercionWarning;
use crate::shape::{classify, RawFields, ShapeKind};
use crate::{NormalizeError, NormalizerConfig};
use chrono::{DateTime, Utc};
use polis_domain::{ExtractionConfidence, PolicyDraft, PolicyFields};
use polis_extraction::ExtractedRecord;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, warn};

/// Length of the random suffix on placeholder policy numbers
const PLACEHOLDER_SUFFIX_LEN: usize = 6;

/// Output of a successful normalization
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Draft ready for identity binding
    pub draft: PolicyDraft,

    /// Layout the record was recognized as
    pub shape: ShapeKind,

    /// Low-confidence coercions made along the way
    pub warnings: Vec<CoercionWarning>,
}

/// Turns raw extraction records into policy drafts
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    /// Create a new normalizer with the given configuration
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Create a normalizer with default configuration
    pub fn default_config() -> Self {
        Self::new(NormalizerConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one record
    ///
    /// Every populated field is copied from the record after coercion. The only
    /// value not traceable to the input is a synthesized policy number, which
    /// is flagged on the draft.
    pub fn normalize(
        &self,
        record: &ExtractedRecord,
        source_file: Option<&str>,
        extracted_at: DateTime<Utc>,
    ) -> Result<Normalized, NormalizeError> {
        let shape = classify(record.value())
            .ok_or_else(|| NormalizeError::InvalidRecord(vec!["record is not a JSON object".to_string()]))?;
        let kind = shape.kind();

        let mut warnings = Vec::new();
        let raw = shape.extract(&mut warnings);
        let source_file = source_file.map(str::trim).filter(|s| !s.is_empty());

        self.check(kind, &raw, source_file)?;

        let confidence = match kind {
            ShapeKind::Unrecognized => ExtractionConfidence::Low,
            ShapeKind::Flat | ShapeKind::Structured => ExtractionConfidence::High,
        };

        let (policy_number, synthesized) = match raw.policy_number.clone() {
            Some(number) => (number, false),
            None => {
                let placeholder = self.placeholder_policy_number(extracted_at);
                debug!("No policy number in record, using placeholder {}", placeholder);
                (placeholder, true)
            }
        };

        for warning in &warnings {
            debug!("Coercion warning: {}", warning);
        }
        if kind == ShapeKind::Unrecognized {
            warn!(
                "Record from {} matches no known shape; keeping a low-confidence draft",
                source_file.unwrap_or("<unknown file>")
            );
        }

        let RawFields {
            insured_name,
            insurer_name,
            policy_type,
            premium,
            monthly_amount,
            effective_date,
            expiration_date,
            installment_count,
            deductible,
            document_number,
            document_kind,
            vehicle,
            broker_name,
            coverage_lines,
            ..
        } = raw;

        let fields = PolicyFields {
            insured_name,
            insurer_name,
            policy_number,
            policy_number_synthesized: synthesized,
            policy_type,
            premium,
            monthly_amount,
            effective_date,
            expiration_date,
            installment_count,
            deductible,
            document_number,
            document_kind,
            vehicle,
            broker_name,
            source_file: source_file.map(str::to_string),
            extracted_at,
            confidence,
        };

        Ok(Normalized {
            draft: PolicyDraft { fields, coverage_lines },
            shape: kind,
            warnings,
        })
    }

    /// Apply the structural validity rules for the detected shape
    fn check(&self, kind: ShapeKind, raw: &RawFields, source_file: Option<&str>) -> Result<(), NormalizeError> {
        let mut reasons = Vec::new();

        match kind {
            ShapeKind::Flat | ShapeKind::Structured => {
                if raw.insured_name.is_none() && raw.insurer_name.is_none() {
                    reasons.push("missing both insured name and insurer name".to_string());
                }
            }
            ShapeKind::Unrecognized => {
                if !self.config.allow_unrecognized_shape {
                    reasons.push("record matches no known shape".to_string());
                } else if source_file.is_none() && raw.premium.is_none() {
                    reasons.push("unrecognized record has neither a source file nor a financial figure".to_string());
                }
            }
        }

        if raw.policy_number.is_none() && !self.config.synthesize_missing_policy_number {
            reasons.push("missing policy number".to_string());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(NormalizeError::InvalidRecord(reasons))
        }
    }

    /// Build `<prefix>-<yyyymmddHHMMSS>-<random>`
    fn placeholder_policy_number(&self, at: DateTime<Utc>) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PLACEHOLDER_SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!(
            "{}-{}-{}",
            self.config.placeholder_prefix.trim(),
            at.format("%Y%m%d%H%M%S"),
            suffix.to_uppercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
    }

    fn normalize(value: serde_json::Value, source: Option<&str>) -> Result<Normalized, NormalizeError> {
        Normalizer::default_config().normalize(&ExtractedRecord::new(value), source, at())
    }

    #[test]
    fn test_flat_record() {
        let out = normalize(
            json!({
                "insured_name": "Maria Lopez",
                "insurer_name": "GNP",
                "policy_number": "GNP-1",
                "expiration_date": "2025-12-31",
                "premium": 1200
            }),
            Some("gnp.pdf"),
        )
        .unwrap();

        assert_eq!(out.shape, ShapeKind::Flat);
        let fields = &out.draft.fields;
        assert_eq!(fields.policy_number, "GNP-1");
        assert!(!fields.policy_number_synthesized);
        assert_eq!(fields.premium, Some(1200.0));
        assert_eq!(fields.expiration_date, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(fields.source_file.as_deref(), Some("gnp.pdf"));
        assert_eq!(fields.extracted_at, at());
        assert_eq!(fields.confidence, ExtractionConfidence::High);
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let out = normalize(json!({"insurer_name": "AXA", "policy_number": "AXA-9"}), None).unwrap();
        let fields = &out.draft.fields;

        assert_eq!(fields.insured_name, None);
        assert_eq!(fields.policy_type, None);
        assert_eq!(fields.premium, None);
        assert_eq!(fields.monthly_amount, None);
        assert_eq!(fields.effective_date, None);
        assert_eq!(fields.expiration_date, None);
        assert_eq!(fields.installment_count, None);
        assert_eq!(fields.deductible, None);
        assert_eq!(fields.document_number, None);
        assert_eq!(fields.document_kind, None);
        assert!(fields.vehicle.is_empty());
        assert_eq!(fields.broker_name, None);
        assert_eq!(fields.source_file, None);
        assert!(out.draft.coverage_lines.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_missing_policy_number_gets_placeholder() {
        let out = normalize(json!({"insured_name": "Juan"}), None).unwrap();
        let fields = &out.draft.fields;

        assert!(fields.policy_number_synthesized);
        assert!(fields.policy_number.starts_with("PEND-20250115103000-"));
        let suffix = fields.policy_number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_missing_both_names_is_invalid() {
        let err = normalize(json!({"policy_number": "X-1", "premium": 10}), None).unwrap_err();
        assert_eq!(err.reasons(), ["missing both insured name and insurer name".to_string()]);
    }

    #[test]
    fn test_non_object_is_invalid() {
        assert!(matches!(normalize(json!("text"), None), Err(NormalizeError::InvalidRecord(_))));
        assert!(matches!(normalize(json!(42), None), Err(NormalizeError::InvalidRecord(_))));
    }

    #[test]
    fn test_unrecognized_record_is_low_confidence() {
        let out = normalize(json!({"resumen": "poliza anual", "importe": "$3,000"}), Some("scan.pdf")).unwrap();

        assert_eq!(out.shape, ShapeKind::Unrecognized);
        let fields = &out.draft.fields;
        assert_eq!(fields.confidence, ExtractionConfidence::Low);
        assert_eq!(fields.premium, Some(3000.0));
        assert_eq!(fields.insured_name, None);
        assert!(fields.policy_number_synthesized);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_unrecognized_with_filename_only() {
        let out = normalize(json!({"notes": "illegible"}), Some("blurry.pdf")).unwrap();
        assert_eq!(out.draft.fields.premium, None);
        assert_eq!(out.draft.fields.source_file.as_deref(), Some("blurry.pdf"));
    }

    #[test]
    fn test_unrecognized_without_anchor_is_invalid() {
        let err = normalize(json!({"notes": "illegible"}), None).unwrap_err();
        assert_eq!(err.reasons().len(), 1);
    }

    #[test]
    fn test_strict_config() {
        let normalizer = Normalizer::new(NormalizerConfig::strict());

        let err = normalizer
            .normalize(&ExtractedRecord::new(json!({"insured_name": "Ana"})), None, at())
            .unwrap_err();
        assert_eq!(err.reasons(), ["missing policy number".to_string()]);

        let err = normalizer
            .normalize(&ExtractedRecord::new(json!({"importe": 100})), Some("a.pdf"), at())
            .unwrap_err();
        assert!(err.reasons().contains(&"record matches no known shape".to_string()));
    }

    #[test]
    fn test_low_confidence_coercions_are_warnings() {
        let out = normalize(
            json!({
                "aseguradora": "Qualitas",
                "numero_poliza": "Q-5",
                "prima_total": "$8,400.00 MXN",
                "fecha_fin": "31/12/2025",
                "numero_pagos": "12 mensualidades",
                "fecha_inicio": "someday"
            }),
            None,
        )
        .unwrap();

        let fields = &out.draft.fields;
        assert_eq!(fields.premium, Some(8400.0));
        assert_eq!(fields.expiration_date, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(fields.installment_count, Some(12));
        assert_eq!(fields.effective_date, None);
        assert_eq!(out.warnings.len(), 4);
    }
}
