//! Polis Storage Layer
//!
//! Implements the `PolicyStore` and `IdentityDirectory` traits on SQLite.
//!
//! # Architecture
//!
//! - One `policies` row per natural key `(owner_id, policy_number)`, enforced
//!   by a UNIQUE constraint
//! - `installments` and `coverage_lines` children, cascading on delete
//! - `accounts` mapping emails to owners for identity resolution
//!
//! # Examples
//!
//! ```no_run
//! use polis_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for policy operations
//! ```

#![warn(missing_docs)]

use chrono::Utc;
use polis_domain::traits::{IdentityDirectory, PolicyStore};
use polis_domain::{
    CanonicalPolicy, CoverageLine, ExtractionConfidence, Installment, OwnerId, PolicyAggregate, PolicyFields,
    PolicyId, PolicyStatus, StoredPolicy, VehicleInfo,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Policy not found
    #[error("Policy not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

const POLICY_COLUMNS: &str = "id, owner_id, policy_number, policy_number_synthesized, insured_name, insurer_name,
     policy_type, premium, monthly_amount, effective_date, expiration_date, installment_count, deductible,
     document_number, document_kind, vehicle_model, vehicle_plate, vehicle_year, broker_name, source_file,
     extracted_at, confidence, status";

/// SQLite-based implementation of PolicyStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one instance behind a mutex
/// or give each thread its own SqliteStore.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Register (or re-point) the owner of an email address
    pub fn register_account(&mut self, email: &str, owner: &OwnerId) -> Result<(), StoreError> {
        let email = normalize_email(email)
            .ok_or_else(|| StoreError::InvalidData("email must not be empty".to_string()))?;

        self.conn.execute(
            "INSERT INTO accounts (email, owner_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET owner_id = excluded.owner_id",
            params![email, owner.as_str(), Utc::now()],
        )?;
        debug!("Registered account {} -> {}", email, owner);
        Ok(())
    }

    /// Convert PolicyId to bytes for storage
    fn policy_id_to_bytes(id: PolicyId) -> Vec<u8> {
        id.to_bytes().to_vec()
    }

    /// Convert bytes to PolicyId
    fn bytes_to_policy_id(bytes: &[u8]) -> Result<PolicyId, StoreError> {
        PolicyId::from_bytes(bytes).map_err(StoreError::InvalidData)
    }

    fn row_to_policy(row: &Row<'_>) -> rusqlite::Result<StoredPolicy> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_policy_id(&id_bytes).map_err(|e| conversion_failure(0, e))?;

        let owner_raw: String = row.get(1)?;
        let owner = OwnerId::parse(&owner_raw)
            .ok_or_else(|| conversion_failure(1, StoreError::InvalidData("empty owner_id".to_string())))?;

        let confidence_raw: String = row.get(21)?;
        let confidence = ExtractionConfidence::parse(&confidence_raw).ok_or_else(|| {
            conversion_failure(21, StoreError::InvalidData(format!("Unknown confidence: {}", confidence_raw)))
        })?;

        let status_raw: String = row.get(22)?;
        let status = PolicyStatus::parse(&status_raw)
            .ok_or_else(|| conversion_failure(22, StoreError::InvalidData(format!("Unknown status: {}", status_raw))))?;

        let fields = PolicyFields {
            policy_number: row.get(2)?,
            policy_number_synthesized: row.get(3)?,
            insured_name: row.get(4)?,
            insurer_name: row.get(5)?,
            policy_type: row.get(6)?,
            premium: row.get(7)?,
            monthly_amount: row.get(8)?,
            effective_date: row.get(9)?,
            expiration_date: row.get(10)?,
            installment_count: row.get(11)?,
            deductible: row.get(12)?,
            document_number: row.get(13)?,
            document_kind: row.get(14)?,
            vehicle: VehicleInfo {
                model: row.get(15)?,
                plate: row.get(16)?,
                year: row.get(17)?,
            },
            broker_name: row.get(18)?,
            source_file: row.get(19)?,
            extracted_at: row.get(20)?,
            confidence,
        };

        Ok(StoredPolicy {
            id,
            policy: CanonicalPolicy { owner, fields, status },
        })
    }
}

fn conversion_failure(column: usize, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

// Statement helpers take a plain connection so they run unchanged inside a transaction

fn find_id(conn: &Connection, owner: &OwnerId, policy_number: &str) -> Result<Option<PolicyId>, StoreError> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT id FROM policies WHERE owner_id = ?1 AND policy_number = ?2",
            params![owner.as_str(), policy_number],
            |row| row.get(0),
        )
        .optional()?;

    bytes.map(|b| SqliteStore::bytes_to_policy_id(&b)).transpose()
}

fn upsert(conn: &Connection, policy: &CanonicalPolicy) -> Result<PolicyId, StoreError> {
    let existing = find_id(conn, &policy.owner, policy.policy_number())?;
    let id = existing.unwrap_or_default();
    let f = &policy.fields;
    let id_bytes = SqliteStore::policy_id_to_bytes(id);
    let owner = policy.owner.as_str();
    let confidence = f.confidence.as_str();
    let status = policy.status.as_str();

    let values = params![
        id_bytes,
        owner,
        &f.policy_number,
        f.policy_number_synthesized,
        &f.insured_name,
        &f.insurer_name,
        &f.policy_type,
        f.premium,
        f.monthly_amount,
        f.effective_date,
        f.expiration_date,
        f.installment_count,
        f.deductible,
        &f.document_number,
        &f.document_kind,
        &f.vehicle.model,
        &f.vehicle.plate,
        f.vehicle.year,
        &f.broker_name,
        &f.source_file,
        f.extracted_at,
        confidence,
        status,
    ];

    if existing.is_some() {
        conn.execute(
            "UPDATE policies SET
                owner_id = ?2, policy_number = ?3, policy_number_synthesized = ?4, insured_name = ?5,
                insurer_name = ?6, policy_type = ?7, premium = ?8, monthly_amount = ?9, effective_date = ?10,
                expiration_date = ?11, installment_count = ?12, deductible = ?13, document_number = ?14,
                document_kind = ?15, vehicle_model = ?16, vehicle_plate = ?17, vehicle_year = ?18,
                broker_name = ?19, source_file = ?20, extracted_at = ?21, confidence = ?22, status = ?23
             WHERE id = ?1",
            values,
        )?;
        debug!("Updated policy {} ({})", id, policy.policy_number());
    } else {
        conn.execute(
            &format!(
                "INSERT INTO policies ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
                POLICY_COLUMNS
            ),
            values,
        )?;
        debug!("Inserted policy {} ({})", id, policy.policy_number());
    }

    Ok(id)
}

fn ensure_exists(conn: &Connection, id: PolicyId) -> Result<(), StoreError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM policies WHERE id = ?1",
            params![SqliteStore::policy_id_to_bytes(id)],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or_else(|| StoreError::NotFound(id.to_string()))
}

fn write_installments(conn: &Connection, id: PolicyId, installments: &[Installment]) -> Result<(), StoreError> {
    ensure_exists(conn, id)?;
    let id_bytes = SqliteStore::policy_id_to_bytes(id);

    conn.execute("DELETE FROM installments WHERE policy_id = ?1", params![&id_bytes])?;
    let mut stmt = conn.prepare(
        "INSERT INTO installments (policy_id, sequence, amount, due_date, paid) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for installment in installments {
        stmt.execute(params![
            &id_bytes,
            installment.sequence,
            installment.amount,
            installment.due_date,
            installment.paid,
        ])?;
    }
    Ok(())
}

fn write_coverage_lines(conn: &Connection, id: PolicyId, lines: &[CoverageLine]) -> Result<(), StoreError> {
    ensure_exists(conn, id)?;
    let id_bytes = SqliteStore::policy_id_to_bytes(id);

    conn.execute("DELETE FROM coverage_lines WHERE policy_id = ?1", params![&id_bytes])?;
    let mut stmt = conn.prepare(
        "INSERT INTO coverage_lines (policy_id, position, description, limit_amount) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, line) in lines.iter().enumerate() {
        stmt.execute(params![&id_bytes, position as i64, &line.description, line.limit])?;
    }
    Ok(())
}

impl PolicyStore for SqliteStore {
    type Error = StoreError;

    fn find_policy_by_natural_key(&self, owner: &OwnerId, policy_number: &str) -> Result<Option<PolicyId>, Self::Error> {
        find_id(&self.conn, owner, policy_number)
    }

    fn upsert_policy(&mut self, policy: &CanonicalPolicy) -> Result<PolicyId, Self::Error> {
        upsert(&self.conn, policy)
    }

    fn replace_installments(&mut self, id: PolicyId, installments: &[Installment]) -> Result<(), Self::Error> {
        write_installments(&self.conn, id, installments)
    }

    fn replace_coverage_lines(&mut self, id: PolicyId, lines: &[CoverageLine]) -> Result<(), Self::Error> {
        write_coverage_lines(&self.conn, id, lines)
    }

    fn save_aggregate(&mut self, aggregate: &PolicyAggregate) -> Result<PolicyId, Self::Error> {
        let tx = self.conn.transaction()?;
        let id = upsert(&tx, &aggregate.policy)?;
        write_installments(&tx, id, &aggregate.installments)?;
        write_coverage_lines(&tx, id, &aggregate.coverage_lines)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_policy(&self, id: PolicyId) -> Result<Option<StoredPolicy>, Self::Error> {
        let policy = self
            .conn
            .query_row(
                &format!("SELECT {} FROM policies WHERE id = ?1", POLICY_COLUMNS),
                params![Self::policy_id_to_bytes(id)],
                Self::row_to_policy,
            )
            .optional()?;
        Ok(policy)
    }

    fn list_policies(&self, owner: Option<&OwnerId>) -> Result<Vec<StoredPolicy>, Self::Error> {
        let mut sql = format!("SELECT {} FROM policies", POLICY_COLUMNS);
        if owner.is_some() {
            sql.push_str(" WHERE owner_id = ?1");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match owner {
            Some(owner) => stmt.query_map(params![owner.as_str()], Self::row_to_policy)?,
            None => stmt.query_map([], Self::row_to_policy)?,
        };

        let mut policies = Vec::new();
        for row in rows {
            policies.push(row?);
        }
        Ok(policies)
    }

    fn installments(&self, id: PolicyId) -> Result<Vec<Installment>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence, amount, due_date, paid FROM installments WHERE policy_id = ?1 ORDER BY sequence",
        )?;
        let rows = stmt.query_map(params![Self::policy_id_to_bytes(id)], |row| {
            Ok(Installment {
                sequence: row.get(0)?,
                amount: row.get(1)?,
                due_date: row.get(2)?,
                paid: row.get(3)?,
            })
        })?;

        let mut installments = Vec::new();
        for row in rows {
            installments.push(row?);
        }
        Ok(installments)
    }

    fn coverage_lines(&self, id: PolicyId) -> Result<Vec<CoverageLine>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT description, limit_amount FROM coverage_lines WHERE policy_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![Self::policy_id_to_bytes(id)], |row| {
            Ok(CoverageLine {
                description: row.get(0)?,
                limit: row.get(1)?,
            })
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }

    fn update_status(&mut self, id: PolicyId, status: PolicyStatus) -> Result<(), Self::Error> {
        let changed = self.conn.execute(
            "UPDATE policies SET status = ?1 WHERE id = ?2",
            params![status.as_str(), Self::policy_id_to_bytes(id)],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl IdentityDirectory for SqliteStore {
    type Error = StoreError;

    fn find_owner_by_email(&self, email: &str) -> Result<Option<OwnerId>, Self::Error> {
        let Some(email) = normalize_email(email) else {
            return Ok(None);
        };

        let owner: Option<String> = self
            .conn
            .query_row("SELECT owner_id FROM accounts WHERE email = ?1", params![email], |row| row.get(0))
            .optional()?;

        Ok(owner.and_then(|raw| OwnerId::parse(&raw)))
    }
}
