//! Refresh command implementation.

use crate::cli::RefreshArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use chrono::Local;
use polis_janitor::{Janitor, JanitorConfig};
use polis_store::SqliteStore;

/// Execute the refresh command.
pub async fn execute_refresh(
    args: RefreshArgs,
    config: &Config,
    store: &mut SqliteStore,
    formatter: &Formatter,
) -> Result<()> {
    let janitor_config = JanitorConfig {
        dry_run: args.dry_run || config.janitor.dry_run,
        ..config.janitor.clone()
    };
    let mut janitor = Janitor::new(janitor_config);

    let report = janitor.sweep(store, Local::now().date_naive())?;
    println!("{}", formatter.format_sweep(&report)?);
    Ok(())
}
