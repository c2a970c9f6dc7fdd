//! Command implementations.

pub mod account;
pub mod ingest;
pub mod list;
pub mod profile;
pub mod refresh;
pub mod show;

pub use self::account::execute_account;
pub use self::ingest::execute_ingest;
pub use self::list::execute_list;
pub use self::profile::execute_profile;
pub use self::refresh::execute_refresh;
pub use self::show::execute_show;

use crate::config::Profile;
use crate::error::Result;
use polis_store::SqliteStore;
use std::fs;

/// Open the profile's database, creating its directory on first use.
pub fn open_store(profile: &Profile) -> Result<SqliteStore> {
    if let Some(parent) = profile.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    tracing::debug!("Opening policy database at {}", profile.database_path.display());
    Ok(SqliteStore::new(&profile.database_path)?)
}
