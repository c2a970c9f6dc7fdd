//! Ingest command implementation.

use crate::cli::IngestArgs;
use crate::config::{Config, OutputFormat};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use polis_extraction::{ExtractionClient, HttpExtractionClient, SourceDocument};
use polis_pipeline::{
    BatchOrchestrator, BatchRequest, BatchResult, FileProcessingStatus, PipelineConfig, ProgressListener,
};
use polis_store::SqliteStore;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Execute the ingest command.
pub async fn execute_ingest(args: IngestArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;
    let documents = read_documents(&args.files)?;

    let mut request = BatchRequest::new(documents);
    if let Some(owner) = args.owner.or_else(|| profile.default_owner.clone()) {
        request = request.with_identity(owner);
    }
    if let Some(email) = args.email.or_else(|| profile.default_email.clone()) {
        request = request.with_email(email);
    }

    let client = HttpExtractionClient::new(&profile.extraction_url)?
        .with_timeout(config.pipeline.extraction_timeout())
        .with_max_files(config.pipeline.max_batch_files);
    let store = Arc::new(Mutex::new(super::open_store(profile)?));

    tracing::info!(
        "Submitting {} file(s) to {}",
        request.files.len(),
        client.endpoint()
    );

    let result = run_batch(client, store, config.pipeline.clone(), request, formatter).await?;
    println!("{}", formatter.format_batch(&result)?);
    Ok(())
}

/// Run one batch, printing live progress for table output.
///
/// On a batch-level failure the final file statuses are printed before the
/// error is returned.
pub async fn run_batch<C: ExtractionClient>(
    client: C,
    store: Arc<Mutex<SqliteStore>>,
    pipeline: PipelineConfig,
    request: BatchRequest,
    formatter: &Formatter,
) -> Result<BatchResult> {
    let mut orchestrator = BatchOrchestrator::with_shared(Arc::new(client), Arc::clone(&store), store, pipeline);
    if formatter.format() == OutputFormat::Table {
        orchestrator = orchestrator.with_listener(Arc::new(ProgressPrinter));
    }

    match orchestrator.process(request).await {
        Ok(result) => Ok(result),
        Err(e) => {
            if formatter.format() != OutputFormat::Quiet {
                eprintln!("{}", formatter.format_file_statuses(&orchestrator.tracker().snapshot()));
            }
            Err(e.into())
        }
    }
}

/// Read every file into memory, keeping only its file name.
pub fn read_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    paths
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CliError::InvalidInput(format!("'{}' is not a file", path.display())))?;
            let content = fs::read(path)?;
            Ok(SourceDocument::new(name, content))
        })
        .collect()
}

/// Prints each status change to stderr so stdout stays machine-readable.
struct ProgressPrinter;

impl ProgressListener for ProgressPrinter {
    fn on_progress(&self, status: &FileProcessingStatus) {
        eprintln!(
            "[{:>3}%] {} {}: {}",
            status.progress, status.file_name, status.state, status.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polis_domain::traits::PolicyStore;
    use polis_domain::OwnerId;
    use polis_extraction::{ExtractionError, MockExtractionClient};
    use polis_pipeline::{FileState, PipelineError};
    use tempfile::TempDir;

    fn quiet() -> Formatter {
        Formatter::new(OutputFormat::Quiet, false)
    }

    fn store(dir: &TempDir) -> Arc<Mutex<SqliteStore>> {
        Arc::new(Mutex::new(SqliteStore::new(dir.path().join("polis.db")).unwrap()))
    }

    #[test]
    fn test_read_documents_keeps_file_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gnp-auto.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let documents = read_documents(&[path]).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].file_name, "gnp-auto.pdf");
        assert_eq!(documents[0].content, b"%PDF-1.4".to_vec());
    }

    #[test]
    fn test_read_missing_document() {
        let dir = TempDir::new().unwrap();
        let result = read_documents(&[dir.path().join("missing.pdf")]);
        assert!(matches!(result, Err(CliError::Io(_))));
    }

    #[tokio::test]
    async fn test_run_batch_persists_and_resolves_email() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store
            .lock()
            .unwrap()
            .register_account("ana@example.com", &OwnerId::parse("user-9").unwrap())
            .unwrap();

        let client = MockExtractionClient::new(
            r#"[{"numero_poliza": "A-1", "aseguradora": "GNP", "nombre_asegurado": "Ana"}]"#,
        );
        let request = BatchRequest::new(vec![SourceDocument::new("gnp.pdf", Vec::new())]).with_email("Ana@Example.com");

        let result = run_batch(client, Arc::clone(&store), PipelineConfig::default(), request, &quiet())
            .await
            .unwrap();

        assert_eq!(result.succeeded, 1);
        let owner = OwnerId::parse("user-9").unwrap();
        let stored = store.lock().unwrap().list_policies(Some(&owner)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].policy.policy_number(), "A-1");
    }

    #[tokio::test]
    async fn test_run_batch_surfaces_batch_errors() {
        let dir = TempDir::new().unwrap();
        let client = MockExtractionClient::failing(ExtractionError::EmptyResponse);
        let request = BatchRequest::new(vec![SourceDocument::new("a.pdf", Vec::new())]).with_identity("user-1");

        let result = run_batch(client, store(&dir), PipelineConfig::default(), request, &quiet()).await;
        assert!(matches!(
            result,
            Err(CliError::Pipeline(PipelineError::Extraction(ExtractionError::EmptyResponse)))
        ));
    }

    #[tokio::test]
    async fn test_unresolved_owner_fails_the_file() {
        let dir = TempDir::new().unwrap();
        let client = MockExtractionClient::new(r#"[{"numero_poliza": "A-1", "aseguradora": "GNP"}]"#);
        let request = BatchRequest::new(vec![SourceDocument::new("a.pdf", Vec::new())]);

        let result = run_batch(client, store(&dir), PipelineConfig::default(), request, &quiet())
            .await
            .unwrap();
        assert_eq!(result.failed, 1);
        assert_eq!(result.file_statuses[0].state, FileState::Failed);
    }
}
