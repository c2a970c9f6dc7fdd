//! Account command implementation.

use crate::cli::{AccountAction, AccountArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use polis_domain::OwnerId;
use polis_store::SqliteStore;

/// Execute the account command.
pub async fn execute_account(args: AccountArgs, store: &mut SqliteStore, formatter: &Formatter) -> Result<()> {
    match args.action {
        AccountAction::Add { email, owner } => add_account(store, &email, &owner, formatter),
    }
}

fn add_account(store: &mut SqliteStore, email: &str, owner: &str, formatter: &Formatter) -> Result<()> {
    if !email.contains('@') {
        return Err(CliError::InvalidInput(format!("'{}' is not an email address", email)));
    }
    let owner = OwnerId::parse(owner).ok_or_else(|| CliError::InvalidInput("Owner cannot be empty".to_string()))?;

    store.register_account(email, &owner)?;
    println!(
        "{}",
        formatter.success(&format!("Registered {} for owner {}", email.trim(), owner))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use polis_domain::traits::IdentityDirectory;

    #[test]
    fn test_add_account() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);

        add_account(&mut store, "Ana@Example.com", "user-3", &formatter).unwrap();

        let owner = store.find_owner_by_email("ana@example.com").unwrap();
        assert_eq!(owner.unwrap().as_str(), "user-3");
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);

        assert!(add_account(&mut store, "not-an-email", "user-3", &formatter).is_err());
        assert!(add_account(&mut store, "ana@example.com", " ", &formatter).is_err());
    }
}
