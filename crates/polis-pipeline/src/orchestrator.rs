//! Core Batch Orchestrator implementation

use crate::config::PipelineConfig;
use crate::duplicate::find_or_insert;
use crate::error::{PipelineError, RecordError};
use crate::identity::IdentityResolver;
use crate::progress::{FileProcessingStatus, FileState, ProgressListener, ProgressTracker};
use crate::types::{BatchRequest, BatchResult, DuplicateEvent, PersistedPolicy, RecordFailure};
use chrono::{DateTime, Local, NaiveDate, Utc};
use polis_domain::traits::{IdentityDirectory, PolicyStore};
use polis_domain::{
    derive_status, generate_installments, split_premium, Installment, OwnerId, PolicyAggregate, PolicyFields,
};
use polis_extraction::{ExtractedRecord, ExtractionClient, ExtractionError, SourceDocument};
use polis_normalizer::Normalizer;
use serde_json::Value;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Record fields that may name the file a record came from
const SOURCE_FILE_KEYS: &[&str] = &["source_file", "file_name", "filename", "archivo"];

const PROGRESS_UPLOADING: u8 = 10;
const PROGRESS_PROCESSING: u8 = 30;
const PROGRESS_DONE: u8 = 100;

/// Message for files the extraction service produced nothing for
pub const NO_POLICY_DATA: &str = "no policy data extracted";

/// The Batch Orchestrator turns a batch of documents into stored policies
///
/// One extraction call is made per batch. Records are then processed one at a
/// time, so a later record always sees what earlier ones wrote.
pub struct BatchOrchestrator<C, S, D>
where
    C: ExtractionClient,
    S: PolicyStore,
    D: IdentityDirectory,
{
    client: Arc<C>,
    store: Arc<Mutex<S>>,
    directory: Arc<Mutex<D>>,
    normalizer: Normalizer,
    tracker: ProgressTracker,
    config: PipelineConfig,
    reference_date: Option<NaiveDate>,
}

impl<C, S, D> BatchOrchestrator<C, S, D>
where
    C: ExtractionClient,
    S: PolicyStore,
    D: IdentityDirectory,
    S::Error: Display,
    D::Error: Display,
{
    /// Create a new orchestrator owning its collaborators
    pub fn new(client: C, store: S, directory: D, config: PipelineConfig) -> Self {
        Self::with_shared(
            Arc::new(client),
            Arc::new(Mutex::new(store)),
            Arc::new(Mutex::new(directory)),
            config,
        )
    }

    /// Create a new orchestrator over shared collaborators
    ///
    /// The store and directory may be the same instance.
    pub fn with_shared(client: Arc<C>, store: Arc<Mutex<S>>, directory: Arc<Mutex<D>>, config: PipelineConfig) -> Self {
        Self {
            client,
            store,
            directory,
            normalizer: Normalizer::new(config.normalizer.clone()),
            tracker: ProgressTracker::new(config.status_clear_delay()),
            config,
            reference_date: None,
        }
    }

    /// Derive statuses against a fixed date instead of today
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Register a progress listener
    pub fn with_listener(self, listener: Arc<dyn ProgressListener>) -> Self {
        self.tracker.add_listener(listener);
        self
    }

    /// Live per-file status table
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Shared handle to the policy store
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Get the configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one batch
    ///
    /// Only batch-level failures (size, extraction errors) are returned as
    /// errors; every file is marked failed first. Per-record failures are
    /// collected in the result.
    pub async fn process(&self, request: BatchRequest) -> Result<BatchResult, PipelineError> {
        let BatchRequest {
            files,
            caller_identity,
            caller_email,
        } = request;

        self.config.validate().map_err(PipelineError::Config)?;

        if files.is_empty() {
            return Err(ExtractionError::EmptyBatch.into());
        }

        let file_names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        let batch = self.tracker.start_batch(&file_names);

        info!("Starting batch {} with {} files", batch, files.len());

        if files.len() > self.config.max_batch_files {
            let error = ExtractionError::BatchSizeExceeded {
                count: files.len(),
                max: self.config.max_batch_files,
            };
            return Err(self.fail_batch(batch, files.len(), error));
        }

        for index in 0..files.len() {
            self.tracker
                .update(batch, index, FileState::Uploading, PROGRESS_UPLOADING, "Uploading");
        }

        let owner_hint = caller_identity.as_deref().and_then(OwnerId::parse);
        let extracted_at = Utc::now();

        let records = match timeout(
            self.config.extraction_timeout(),
            self.client.extract(&files, owner_hint.as_ref()),
        )
        .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => return Err(self.fail_batch(batch, files.len(), e)),
            Err(_) => {
                let error = ExtractionError::Timeout(self.config.extraction_timeout());
                return Err(self.fail_batch(batch, files.len(), error));
            }
        };

        info!("Extraction returned {} records for batch {}", records.len(), batch);

        let targets: Vec<usize> = records
            .iter()
            .enumerate()
            .map(|(position, record)| target_file(record, position, &files))
            .collect();
        let mut expected = vec![0usize; files.len()];
        for &target in &targets {
            expected[target] += 1;
        }

        for (index, &count) in expected.iter().enumerate() {
            self.tracker.update(
                batch,
                index,
                FileState::Processing,
                PROGRESS_PROCESSING,
                format!("Processing {} records", count),
            );
        }

        let today = self.reference_date.unwrap_or_else(|| Local::now().date_naive());
        let context = RecordContext {
            caller_identity: caller_identity.as_deref(),
            caller_email: caller_email.as_deref(),
            extracted_at,
            today,
        };

        let mut policies = Vec::new();
        let mut failures = Vec::new();
        let mut duplicates = Vec::new();
        let mut handled = vec![0usize; files.len()];
        let mut file_errors: Vec<Vec<String>> = vec![Vec::new(); files.len()];

        for (record_index, (record, &target)) in records.iter().zip(&targets).enumerate() {
            let file_name = &files[target].file_name;

            match self.process_record(record, file_name, &context) {
                Ok(persisted) => {
                    if persisted.is_update {
                        info!(
                            "Policy {} was already stored; updated {}",
                            persisted.policy.policy_number(),
                            persisted.id
                        );
                        duplicates.push(DuplicateEvent {
                            policy_number: persisted.policy.policy_number().to_string(),
                            existing_id: persisted.id,
                            display_name: persisted.policy.display_name(),
                        });
                    }
                    policies.push(persisted);
                }
                Err(e) => {
                    warn!("Record {} from {} failed: {}", record_index + 1, file_name, e);
                    file_errors[target].push(format!("record {}: {}", record_index + 1, e));
                    failures.push(RecordFailure {
                        record_index,
                        file_name: file_name.clone(),
                        error: e,
                    });
                }
            }

            handled[target] += 1;
            let progress = PROGRESS_PROCESSING as usize
                + (usize::from(PROGRESS_DONE - PROGRESS_PROCESSING) * handled[target]) / expected[target].max(1);
            self.tracker.update(
                batch,
                target,
                FileState::Processing,
                progress.min(usize::from(PROGRESS_DONE - 1)) as u8,
                format!("Processed {} of {} records", handled[target], expected[target]),
            );
        }

        // Terminal entries may be cleared from the tracker at any moment, so
        // the result keeps its own copy of each final status.
        let mut file_statuses = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let (state, progress, message) = if !file_errors[index].is_empty() {
                (FileState::Failed, 0, file_errors[index].join("; "))
            } else if expected[index] == 0 {
                (FileState::Failed, 0, NO_POLICY_DATA.to_string())
            } else {
                (
                    FileState::Completed,
                    PROGRESS_DONE,
                    format!("{} policies saved", expected[index]),
                )
            };
            let status = self
                .tracker
                .update(batch, index, state, progress, message.clone())
                .unwrap_or_else(|| FileProcessingStatus {
                    batch_id: batch,
                    index,
                    file_name: file.file_name.clone(),
                    progress,
                    state,
                    message,
                });
            file_statuses.push(status);
        }

        let result = BatchResult {
            succeeded: policies.len(),
            failed: failures.len(),
            policies,
            failures,
            duplicates,
            file_statuses,
        };

        info!(
            "Batch {} complete: {} saved, {} updated, {} failed",
            batch,
            result.succeeded - result.duplicates.len(),
            result.duplicates.len(),
            result.failed
        );

        Ok(result)
    }

    /// Resolve, normalize, schedule and persist one record
    fn process_record(
        &self,
        record: &ExtractedRecord,
        file_name: &str,
        context: &RecordContext<'_>,
    ) -> Result<PersistedPolicy, RecordError> {
        let resolution = {
            let directory = self
                .directory
                .lock()
                .map_err(|e| RecordError::Directory(format!("Directory lock error: {}", e)))?;
            IdentityResolver::new(&*directory).resolve(record, context.caller_identity, context.caller_email)?
        };

        let normalized = self
            .normalizer
            .normalize(record, Some(file_name), context.extracted_at)?;
        debug!(
            "Record from {} normalized as {} with {} warnings",
            file_name,
            normalized.shape.as_str(),
            normalized.warnings.len()
        );

        let fields = &normalized.draft.fields;
        let status = derive_status(fields.expiration_date, fields.effective_date, context.today);
        let installments = installment_schedule(fields);

        let (policy, coverage_lines) = normalized.draft.into_policy(resolution.owner, status);
        let aggregate = PolicyAggregate {
            policy,
            installments,
            coverage_lines,
        };

        let upsert = {
            let mut store = self
                .store
                .lock()
                .map_err(|e| RecordError::Persistence(format!("Store lock error: {}", e)))?;
            find_or_insert(&mut *store, &aggregate).map_err(|e| RecordError::Persistence(e.to_string()))?
        };

        Ok(PersistedPolicy {
            id: upsert.policy_id,
            is_update: upsert.is_update,
            installment_count: aggregate.installments.len(),
            coverage_line_count: aggregate.coverage_lines.len(),
            policy: aggregate.policy,
            identity_source: resolution.source,
            shape: normalized.shape,
            warnings: normalized.warnings,
        })
    }

    /// Mark every file of the batch failed with `error`
    fn fail_batch(&self, batch: u64, file_count: usize, error: ExtractionError) -> PipelineError {
        warn!("Batch {} failed: {}", batch, error);
        let message = error.to_string();
        for index in 0..file_count {
            self.tracker.update(batch, index, FileState::Failed, 0, message.clone());
        }
        PipelineError::Extraction(error)
    }
}

/// Caller context shared by every record of a batch
struct RecordContext<'a> {
    caller_identity: Option<&'a str>,
    caller_email: Option<&'a str>,
    extracted_at: DateTime<Utc>,
    today: NaiveDate,
}

/// Index of the submitted file a record belongs to
///
/// A file name written into the record wins; otherwise records map to files by
/// position, and any surplus records go to the last file.
fn target_file(record: &ExtractedRecord, position: usize, files: &[SourceDocument]) -> usize {
    let named = SOURCE_FILE_KEYS
        .iter()
        .find_map(|key| match record.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        })
        .and_then(|name| {
            files
                .iter()
                .position(|f| f.file_name == name)
                .or_else(|| files.iter().position(|f| f.file_name.eq_ignore_ascii_case(name)))
        });

    named.unwrap_or_else(|| position.min(files.len().saturating_sub(1)))
}

/// Payment schedule implied by the policy's fields
///
/// Needs a start date and an installment count. Amounts come from the stated
/// monthly amount, or from the premium split evenly. No amount, no schedule.
fn installment_schedule(fields: &PolicyFields) -> Vec<Installment> {
    let (Some(count), Some(first_due)) = (fields.installment_count, fields.effective_date) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let amount = fields
        .monthly_amount
        .or_else(|| fields.premium.and_then(|premium| split_premium(premium, count)));

    match amount {
        Some(amount) => generate_installments(count, amount, first_due),
        None => {
            debug!("Policy {} states {} installments but no amount", fields.policy_number, count);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files(n: usize) -> Vec<SourceDocument> {
        (0..n)
            .map(|i| SourceDocument::new(format!("file{}.pdf", i + 1), Vec::new()))
            .collect()
    }

    #[test]
    fn test_target_file_by_embedded_name() {
        let record = ExtractedRecord::new(json!({"archivo": "FILE3.pdf"}));
        assert_eq!(target_file(&record, 0, &files(3)), 2);

        let record = ExtractedRecord::new(json!({"source_file": "file2.pdf"}));
        assert_eq!(target_file(&record, 2, &files(3)), 1);
    }

    #[test]
    fn test_target_file_falls_back_to_position_then_last() {
        let record = ExtractedRecord::new(json!({"file_name": "other.pdf"}));
        assert_eq!(target_file(&record, 1, &files(3)), 1);

        let record = ExtractedRecord::new(json!({}));
        assert_eq!(target_file(&record, 7, &files(3)), 2);
    }

    fn fields() -> PolicyFields {
        PolicyFields {
            insured_name: None,
            insurer_name: Some("GNP".to_string()),
            policy_number: "A-1".to_string(),
            policy_number_synthesized: false,
            policy_type: None,
            premium: None,
            monthly_amount: None,
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 31),
            expiration_date: None,
            installment_count: Some(12),
            deductible: None,
            document_number: None,
            document_kind: None,
            vehicle: Default::default(),
            broker_name: None,
            source_file: None,
            extracted_at: Utc::now(),
            confidence: polis_domain::ExtractionConfidence::High,
        }
    }

    #[test]
    fn test_schedule_from_monthly_amount() {
        let mut f = fields();
        f.monthly_amount = Some(100.0);
        f.premium = Some(5000.0);

        let schedule = installment_schedule(&f);
        assert_eq!(schedule.len(), 12);
        assert!(schedule.iter().all(|i| i.amount == 100.0 && !i.paid));
        assert_eq!(schedule[1].due_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_schedule_from_premium_split() {
        let mut f = fields();
        f.premium = Some(1000.0);
        f.installment_count = Some(3);

        let schedule = installment_schedule(&f);
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].amount, 333.33);
    }

    #[test]
    fn test_no_schedule_without_inputs() {
        assert!(installment_schedule(&fields()).is_empty());

        let mut f = fields();
        f.monthly_amount = Some(100.0);
        f.effective_date = None;
        assert!(installment_schedule(&f).is_empty());

        let mut f = fields();
        f.monthly_amount = Some(100.0);
        f.installment_count = Some(0);
        assert!(installment_schedule(&f).is_empty());
    }
}
