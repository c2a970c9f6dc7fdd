//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use polis_domain::{CanonicalPolicy, CoverageLine, Installment, PolicyStatus, StoredPolicy};
use polis_janitor::SweepReport;
use polis_pipeline::{BatchResult, FileProcessingStatus, FileState};
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self { format, color_enabled }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the outcome of an ingest batch.
    pub fn format_batch(&self, result: &BatchResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = json!({
                    "succeeded": result.succeeded,
                    "failed": result.failed,
                    "files": result.file_statuses.iter().map(status_json).collect::<Vec<_>>(),
                    "policies": result.policies.iter().map(|p| {
                        let mut value = policy_json(&p.id.to_string(), &p.policy);
                        value["is_update"] = json!(p.is_update);
                        value["installments"] = json!(p.installment_count);
                        value["coverage_lines"] = json!(p.coverage_line_count);
                        value["identity_source"] = json!(p.identity_source.as_str());
                        value["shape"] = json!(p.shape.as_str());
                        value["warnings"] = json!(p.warnings.iter().map(|w| format!("{}: {}", w.field, w.message)).collect::<Vec<_>>());
                        value
                    }).collect::<Vec<_>>(),
                    "duplicates": result.duplicates.iter().map(|d| json!({
                        "policy_number": d.policy_number,
                        "existing_id": d.existing_id.to_string(),
                        "display_name": d.display_name,
                    })).collect::<Vec<_>>(),
                    "failures": result.failures.iter().map(|f| json!({
                        "record_index": f.record_index,
                        "file_name": f.file_name,
                        "error": f.error.to_string(),
                    })).collect::<Vec<_>>(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(result
                .policies
                .iter()
                .map(|p| p.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut sections = vec![self.format_file_statuses(&result.file_statuses)];

                for duplicate in &result.duplicates {
                    sections.push(self.warning(&format!(
                        "Policy {} ({}) already existed and was updated",
                        duplicate.policy_number, duplicate.display_name
                    )));
                }
                for policy in result.policies.iter().filter(|p| p.policy.fields.policy_number_synthesized) {
                    sections.push(self.info(&format!(
                        "No policy number found for {}; stored as {}",
                        policy.policy.display_name(),
                        policy.policy.policy_number()
                    )));
                }

                let summary = format!("Saved {} policy(ies), {} record(s) failed", result.succeeded, result.failed);
                sections.push(if result.failed == 0 {
                    self.success(&summary)
                } else {
                    self.warning(&summary)
                });
                Ok(sections.join("\n"))
            }
        }
    }

    /// Format per-file statuses as a table.
    pub fn format_file_statuses(&self, statuses: &[FileProcessingStatus]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["File", "State", "Progress", "Message"]);

        for status in statuses {
            builder.push_record([
                status.file_name.clone(),
                self.file_state(status.state),
                format!("{}%", status.progress),
                status.message.clone(),
            ]);
        }

        self.render(builder)
    }

    /// Format a list of stored policies.
    pub fn format_policies(&self, policies: &[StoredPolicy]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = policies.iter().map(|p| policy_json(&p.id.to_string(), &p.policy)).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(policies.iter().map(|p| p.id.to_string()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if policies.is_empty() {
                    return Ok(self.colorize("No policies found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["ID", "Policy No.", "Insured", "Insurer", "Expires", "Premium", "Status"]);

                for stored in policies {
                    let fields = &stored.policy.fields;
                    builder.push_record([
                        stored.id.to_string(),
                        fields.policy_number.clone(),
                        or_dash(fields.insured_name.as_deref()),
                        or_dash(fields.insurer_name.as_deref()),
                        fields.expiration_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                        fields.premium.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".to_string()),
                        self.status(stored.policy.status),
                    ]);
                }

                Ok(self.render(builder))
            }
        }
    }

    /// Format one policy with its children.
    pub fn format_policy_detail(
        &self,
        stored: &StoredPolicy,
        installments: &[Installment],
        coverage_lines: &[CoverageLine],
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut value = policy_json(&stored.id.to_string(), &stored.policy);
                value["installments"] = json!(installments
                    .iter()
                    .map(|i| json!({
                        "sequence": i.sequence,
                        "amount": i.amount,
                        "due_date": i.due_date.to_string(),
                        "paid": i.paid,
                    }))
                    .collect::<Vec<_>>());
                value["coverage_lines"] = json!(coverage_lines
                    .iter()
                    .map(|c| json!({ "description": c.description, "limit": c.limit }))
                    .collect::<Vec<_>>());
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(stored.id.to_string()),
            OutputFormat::Table => {
                let policy = &stored.policy;
                let fields = &policy.fields;

                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                let rows: Vec<(&str, String)> = vec![
                    ("ID", stored.id.to_string()),
                    ("Owner", policy.owner.to_string()),
                    ("Policy No.", fields.policy_number.clone()),
                    ("Insured", or_dash(fields.insured_name.as_deref())),
                    ("Insurer", or_dash(fields.insurer_name.as_deref())),
                    ("Type", or_dash(fields.policy_type.as_deref())),
                    ("Status", self.status(policy.status)),
                    ("Effective", fields.effective_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
                    ("Expires", fields.expiration_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
                    ("Premium", money(fields.premium)),
                    ("Monthly", money(fields.monthly_amount)),
                    ("Deductible", money(fields.deductible)),
                    ("Vehicle", vehicle_line(policy)),
                    ("Broker", or_dash(fields.broker_name.as_deref())),
                    ("Source file", or_dash(fields.source_file.as_deref())),
                    ("Confidence", fields.confidence.as_str().to_string()),
                ];
                for (label, value) in rows {
                    builder.push_record([label.to_string(), value]);
                }
                let mut sections = vec![self.render(builder)];

                if !installments.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["#", "Due", "Amount", "Paid"]);
                    for installment in installments {
                        builder.push_record([
                            installment.sequence.to_string(),
                            installment.due_date.to_string(),
                            format!("{:.2}", installment.amount),
                            if installment.paid { "yes" } else { "no" }.to_string(),
                        ]);
                    }
                    sections.push(self.render(builder));
                }

                if !coverage_lines.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Coverage", "Limit"]);
                    for line in coverage_lines {
                        builder.push_record([line.description.clone(), money(line.limit)]);
                    }
                    sections.push(self.render(builder));
                }

                Ok(sections.join("\n"))
            }
        }
    }

    /// Format the outcome of a status refresh.
    pub fn format_sweep(&self, report: &SweepReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = json!({
                    "checked": report.checked,
                    "dry_run": report.dry_run,
                    "changes": report.changes.iter().map(|c| json!({
                        "id": c.policy_id.to_string(),
                        "policy_number": c.policy_number,
                        "from": c.from.as_str(),
                        "to": c.to.as_str(),
                    })).collect::<Vec<_>>(),
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(report
                .changes
                .iter()
                .map(|c| c.policy_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let verb = if report.dry_run { "would change" } else { "changed" };
                let summary = self.success(&format!("Checked {} policy(ies), {} {}", report.checked, report.changed(), verb));
                if report.changes.is_empty() {
                    return Ok(summary);
                }

                let mut builder = Builder::default();
                builder.push_record(["Policy No.", "From", "To"]);
                for change in &report.changes {
                    builder.push_record([change.policy_number.clone(), self.status(change.from), self.status(change.to)]);
                }
                Ok(format!("{}\n{}", self.render(builder), summary))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn status(&self, status: PolicyStatus) -> String {
        let color = match status {
            PolicyStatus::Current => "green",
            PolicyStatus::Expiring => "yellow",
            PolicyStatus::Expired => "red",
            PolicyStatus::Superseded => "magenta",
        };
        self.colorize(status.as_str(), color)
    }

    fn file_state(&self, state: FileState) -> String {
        let color = match state {
            FileState::Completed => "green",
            FileState::Failed => "red",
            _ => "cyan",
        };
        self.colorize(state.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

/// JSON form of a policy; absent fields are `null`, never invented.
fn policy_json(id: &str, policy: &CanonicalPolicy) -> Value {
    let fields = &policy.fields;
    json!({
        "id": id,
        "owner": policy.owner.as_str(),
        "policy_number": fields.policy_number,
        "policy_number_synthesized": fields.policy_number_synthesized,
        "insured_name": fields.insured_name,
        "insurer_name": fields.insurer_name,
        "policy_type": fields.policy_type,
        "premium": fields.premium,
        "monthly_amount": fields.monthly_amount,
        "effective_date": fields.effective_date.map(|d| d.to_string()),
        "expiration_date": fields.expiration_date.map(|d| d.to_string()),
        "installment_count": fields.installment_count,
        "deductible": fields.deductible,
        "document_number": fields.document_number,
        "document_kind": fields.document_kind,
        "vehicle": {
            "model": fields.vehicle.model,
            "plate": fields.vehicle.plate,
            "year": fields.vehicle.year,
        },
        "broker_name": fields.broker_name,
        "status": policy.status.as_str(),
        "source_file": fields.source_file,
        "extracted_at": fields.extracted_at.to_rfc3339(),
        "confidence": fields.confidence.as_str(),
    })
}

fn status_json(status: &FileProcessingStatus) -> Value {
    json!({
        "file_name": status.file_name,
        "state": status.state.as_str(),
        "progress": status.progress,
        "message": status.message,
    })
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

fn money(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn vehicle_line(policy: &CanonicalPolicy) -> String {
    let vehicle = &policy.fields.vehicle;
    if vehicle.is_empty() {
        return "-".to_string();
    }
    [
        vehicle.model.clone(),
        vehicle.year.map(|y| y.to_string()),
        vehicle.plate.clone(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use polis_domain::{ExtractionConfidence, OwnerId, PolicyFields, PolicyId, VehicleInfo};

    fn create_test_policy() -> StoredPolicy {
        StoredPolicy {
            id: PolicyId::new(),
            policy: CanonicalPolicy {
                owner: OwnerId::parse("user-1").unwrap(),
                fields: PolicyFields {
                    insured_name: Some("Ana Torres".to_string()),
                    insurer_name: Some("GNP".to_string()),
                    policy_number: "A-100".to_string(),
                    policy_number_synthesized: false,
                    policy_type: Some("auto".to_string()),
                    premium: Some(1200.0),
                    monthly_amount: None,
                    effective_date: NaiveDate::from_ymd_opt(2025, 1, 1),
                    expiration_date: NaiveDate::from_ymd_opt(2026, 1, 1),
                    installment_count: Some(12),
                    deductible: None,
                    document_number: None,
                    document_kind: None,
                    vehicle: VehicleInfo {
                        model: Some("Versa".to_string()),
                        plate: Some("ABC-123".to_string()),
                        year: Some(2021),
                    },
                    broker_name: None,
                    source_file: Some("gnp.pdf".to_string()),
                    extracted_at: Utc::now(),
                    confidence: ExtractionConfidence::High,
                },
                status: PolicyStatus::Current,
            },
        }
    }

    #[test]
    fn test_json_format_keeps_absent_fields_null() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_policies(&[create_test_policy()]).unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["policy_number"], "A-100");
        assert_eq!(parsed[0]["status"], "current");
        assert!(parsed[0]["deductible"].is_null());
        assert!(parsed[0]["broker_name"].is_null());
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let policy = create_test_policy();
        let output = formatter.format_policies(&[policy.clone()]).unwrap();
        assert_eq!(output, policy.id.to_string());
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_policies(&[create_test_policy()]).unwrap();
        assert!(output.contains("Policy No."));
        assert!(output.contains("A-100"));
        assert!(output.contains("1200.00"));
    }

    #[test]
    fn test_empty_policies() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_policies(&[]).unwrap();
        assert!(output.contains("No policies found"));
    }

    #[test]
    fn test_detail_lists_children() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let installments = vec![Installment {
            sequence: 1,
            amount: 100.0,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            paid: false,
        }];
        let coverages = vec![CoverageLine::new("Civil liability", Some(3_000_000.0))];

        let output = formatter
            .format_policy_detail(&create_test_policy(), &installments, &coverages)
            .unwrap();
        assert!(output.contains("Versa 2021 ABC-123"));
        assert!(output.contains("2025-01-01"));
        assert!(output.contains("Civil liability"));
        assert!(output.contains("3000000.00"));
    }

    #[test]
    fn test_detail_json_includes_children() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter
            .format_policy_detail(&create_test_policy(), &[], &[CoverageLine::new("Theft", None)])
            .unwrap();

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["installments"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["coverage_lines"][0]["description"], "Theft");
        assert!(parsed["coverage_lines"][0]["limit"].is_null());
    }

    #[test]
    fn test_empty_sweep() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_sweep(&SweepReport::default()).unwrap();
        assert_eq!(output, "✓ Checked 0 policy(ies), 0 changed");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }
}
