//! Show command implementation.

use crate::cli::ShowArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use polis_domain::traits::PolicyStore;
use polis_domain::PolicyId;
use polis_store::SqliteStore;

/// Execute the show command.
pub async fn execute_show(args: ShowArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let id = PolicyId::from_string(args.id.trim()).map_err(CliError::InvalidInput)?;

    let stored = store
        .get_policy(id)?
        .ok_or_else(|| CliError::NotFound(format!("Policy {}", id)))?;
    let installments = store.installments(id)?;
    let coverage_lines = store.coverage_lines(id)?;

    println!(
        "{}",
        formatter.format_policy_detail(&stored, &installments, &coverage_lines)?
    );
    Ok(())
}
