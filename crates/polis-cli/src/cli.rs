//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Polis CLI - Ingest insurance policy documents and keep them reconciled.
#[derive(Debug, Parser)]
#[command(name = "polis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "POLIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract, normalize and store the policies in up to 10 documents
    Ingest(IngestArgs),

    /// List stored policies
    List(ListArgs),

    /// Show one policy with its installments and coverages
    Show(ShowArgs),

    /// Manage the email-to-owner account directory
    Account(AccountArgs),

    /// Re-derive the status of every stored policy
    Refresh(RefreshArgs),

    /// Manage configuration profiles
    Profile(ProfileArgs),
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Policy documents to submit as one batch
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Owner to file the policies under
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Email used to look up the owner when none is given
    #[arg(short, long)]
    pub email: Option<String>,
}

/// Arguments for the list command.
#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Only list policies of this owner
    #[arg(short, long)]
    pub owner: Option<String>,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Policy ID (as printed by `list`)
    pub id: String,
}

/// Arguments for account management.
#[derive(Debug, Parser)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub action: AccountAction,
}

/// Account management actions.
#[derive(Debug, Subcommand)]
pub enum AccountAction {
    /// Register (or re-point) an email address
    Add {
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Owner identity the email belongs to
        #[arg(short, long)]
        owner: String,
    },
}

/// Arguments for the refresh command.
#[derive(Debug, Parser)]
pub struct RefreshArgs {
    /// Report the changes without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Use {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,
        /// Extraction service endpoint
        #[arg(short, long)]
        url: String,
        /// SQLite database file
        #[arg(short, long)]
        database: PathBuf,
        /// Default owner
        #[arg(short, long)]
        owner: Option<String>,
        /// Default email
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_command() {
        let cli = Cli::parse_from(["polis", "ingest", "a.pdf", "b.pdf", "--owner", "user-1"]);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.owner.as_deref(), Some("user-1"));
                assert!(args.email.is_none());
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_ingest_requires_files() {
        assert!(Cli::try_parse_from(["polis", "ingest"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["polis", "list", "--format", "json", "--no-color", "--profile", "work"]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert!(cli.no_color);
        assert_eq!(cli.profile.as_deref(), Some("work"));
    }

    #[test]
    fn test_account_add() {
        let cli = Cli::parse_from(["polis", "account", "add", "--email", "ana@example.com", "--owner", "user-1"]);
        match cli.command {
            Command::Account(AccountArgs {
                action: AccountAction::Add { email, owner },
            }) => {
                assert_eq!(email, "ana@example.com");
                assert_eq!(owner, "user-1");
            }
            _ => panic!("Expected Account command"),
        }
    }

    #[test]
    fn test_refresh_dry_run() {
        let cli = Cli::parse_from(["polis", "refresh", "--dry-run"]);
        assert!(matches!(cli.command, Command::Refresh(RefreshArgs { dry_run: true })));
    }

    #[test]
    fn test_profile_use() {
        let cli = Cli::parse_from(["polis", "profile", "use", "work"]);
        match cli.command {
            Command::Profile(ProfileArgs {
                action: ProfileAction::Use { name },
            }) => assert_eq!(name, "work"),
            _ => panic!("Expected Profile command"),
        }
    }
}
