//! List command implementation.

use crate::cli::ListArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use polis_domain::traits::PolicyStore;
use polis_domain::{OwnerId, StoredPolicy};
use polis_store::SqliteStore;

/// Execute the list command.
pub async fn execute_list(args: ListArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let policies = list_policies(store, args.owner.as_deref())?;
    println!("{}", formatter.format_policies(&policies)?);
    Ok(())
}

fn list_policies(store: &SqliteStore, owner: Option<&str>) -> Result<Vec<StoredPolicy>> {
    let owner = owner
        .map(|raw| OwnerId::parse(raw).ok_or_else(|| CliError::InvalidInput("Owner cannot be empty".to_string())))
        .transpose()?;
    Ok(store.list_policies(owner.as_ref())?)
}
