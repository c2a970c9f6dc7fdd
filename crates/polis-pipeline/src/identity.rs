//! Ownership resolution for extracted records
//!
//! Strategies, in priority order:
//!
//! 1. Identity of the caller that submitted the batch
//! 2. Identity embedded in the record (top level or under `metadata`)
//! 3. Directory lookup by email (caller's hint, else an email in the record)

use crate::RecordError;
use polis_domain::traits::IdentityDirectory;
use polis_domain::OwnerId;
use polis_extraction::ExtractedRecord;
use serde_json::Value;
use std::fmt::Display;
use tracing::{debug, warn};

const EMBEDDED_ID_KEYS: &[&str] = &["user_id", "userId", "owner_id", "ownerId", "usuario_id"];
const EMBEDDED_EMAIL_KEYS: &[&str] = &["email", "user_email", "correo"];
const METADATA_KEY: &str = "metadata";

/// Which strategy supplied the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Caller's own identity
    Caller,
    /// Identity written into the record
    Embedded,
    /// Directory match on an email address
    EmailLookup,
}

impl IdentitySource {
    /// Get the source name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::Caller => "caller",
            IdentitySource::Embedded => "embedded",
            IdentitySource::EmailLookup => "email_lookup",
        }
    }
}

/// Outcome of identity resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Owning account
    pub owner: OwnerId,

    /// Strategy that produced it
    pub source: IdentitySource,

    /// Embedded identity overridden by a different caller identity
    pub conflicting_embedded: Option<OwnerId>,
}

/// Resolves the owner of each record against an identity directory
pub struct IdentityResolver<'a, D> {
    directory: &'a D,
}

impl<'a, D> IdentityResolver<'a, D>
where
    D: IdentityDirectory,
    D::Error: Display,
{
    /// Create a resolver backed by `directory`
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Resolve the owner of `record`
    ///
    /// When the caller and the record disagree, the caller wins and the
    /// embedded identity is reported on the resolution.
    pub fn resolve(
        &self,
        record: &ExtractedRecord,
        caller_identity: Option<&str>,
        caller_email: Option<&str>,
    ) -> Result<Resolution, RecordError> {
        let caller = caller_identity.and_then(OwnerId::parse);
        let embedded = embedded_identity(record);

        if let Some(owner) = caller {
            let conflicting_embedded = embedded.filter(|e| *e != owner);
            if let Some(other) = &conflicting_embedded {
                warn!(
                    "Record names owner '{}' but was submitted by '{}'; keeping the caller",
                    other, owner
                );
            }
            return Ok(Resolution {
                owner,
                source: IdentitySource::Caller,
                conflicting_embedded,
            });
        }

        if let Some(owner) = embedded {
            debug!("Using identity embedded in record: {}", owner);
            return Ok(Resolution {
                owner,
                source: IdentitySource::Embedded,
                conflicting_embedded: None,
            });
        }

        let hint = caller_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .or_else(|| embedded_email(record));

        if let Some(email) = hint {
            let found = self
                .directory
                .find_owner_by_email(&email)
                .map_err(|e| RecordError::Directory(e.to_string()))?;
            if let Some(owner) = found {
                debug!("Resolved {} through the account directory", email);
                return Ok(Resolution {
                    owner,
                    source: IdentitySource::EmailLookup,
                    conflicting_embedded: None,
                });
            }
            debug!("No account registered for {}", email);
        }

        Err(RecordError::UnresolvedIdentity)
    }
}

fn embedded_identity(record: &ExtractedRecord) -> Option<OwnerId> {
    lookup(record.value(), EMBEDDED_ID_KEYS).and_then(|raw| OwnerId::parse(&raw))
}

fn embedded_email(record: &ExtractedRecord) -> Option<String> {
    lookup(record.value(), EMBEDDED_EMAIL_KEYS)
}

/// First non-blank value under `keys`, top level first, then under `metadata`
fn lookup(value: &Value, keys: &[&str]) -> Option<String> {
    let scalar = |obj: &serde_json::Map<String, Value>| {
        keys.iter().find_map(|key| match obj.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    };

    let obj = value.as_object()?;
    scalar(obj).or_else(|| obj.get(METADATA_KEY).and_then(Value::as_object).and_then(scalar))
}
