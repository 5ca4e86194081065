// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded document database backed by redb (pure Rust, ACID).
//!
//! Every collection is a `&str → &[u8]` table holding JSON-encoded records.
//! Secondary tables act as unique indexes and are always written in the same
//! write transaction as the record they point to.
//!
//! ## Table Layout
//!
//! - `users`: user_id → User
//! - `user_identities`: `email:<email>` / `mobile:<mobile>` → user_id (unique)
//! - `orders`: order_id → Order
//! - `wallet_ledger`: entry_id → LedgerEntry
//! - `ledger_order_index`: order_id → entry_id (at most one entry per order)
//! - `asset_rates`: `<ASSET>|<scope>` → AssetRate (`*` is the global scope)
//! - `kyc_documents`: kyc_id → KycDocument
//! - `kyc_user_index`: user_id → kyc_id
//! - `saved_wallets`: wallet_id → SavedWallet
//! - `otp_store`: otp_id → OtpRecord
//! - `password_reset_tokens`: token → PasswordResetToken
//! - `audit_events`: `!timestamp|event_id` → AuditEvent (newest first)

use std::path::Path;

use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{de::DeserializeOwned, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Every table maps a string key to JSON bytes.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

pub const USERS: JsonTable = TableDefinition::new("users");
pub const USER_IDENTITIES: JsonTable = TableDefinition::new("user_identities");
pub const ORDERS: JsonTable = TableDefinition::new("orders");
pub const WALLET_LEDGER: JsonTable = TableDefinition::new("wallet_ledger");
pub const LEDGER_ORDER_INDEX: JsonTable = TableDefinition::new("ledger_order_index");
pub const ASSET_RATES: JsonTable = TableDefinition::new("asset_rates");
pub const KYC_DOCUMENTS: JsonTable = TableDefinition::new("kyc_documents");
pub const KYC_USER_INDEX: JsonTable = TableDefinition::new("kyc_user_index");
pub const SAVED_WALLETS: JsonTable = TableDefinition::new("saved_wallets");
pub const OTP_STORE: JsonTable = TableDefinition::new("otp_store");
pub const PASSWORD_RESET_TOKENS: JsonTable = TableDefinition::new("password_reset_tokens");
pub const AUDIT_EVENTS: JsonTable = TableDefinition::new("audit_events");

const ALL_TABLES: [JsonTable; 12] = [
    USERS,
    USER_IDENTITIES,
    ORDERS,
    WALLET_LEDGER,
    LEDGER_ORDER_INDEX,
    ASSET_RATES,
    KYC_DOCUMENTS,
    KYC_USER_INDEX,
    SAVED_WALLETS,
    OTP_STORE,
    PASSWORD_RESET_TOKENS,
    AUDIT_EVENTS,
];

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "otc-desk.redb";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("user {user_id} may not access {resource}")]
    PermissionDenied { user_id: String, resource: String },
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID document store.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        for table in ALL_TABLES {
            let _ = write_txn.open_table(table)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open the database file inside a data directory.
    pub fn open_in_dir(data_dir: &Path) -> StorageResult<Self> {
        Self::open(&data_dir.join(DATABASE_FILE))
    }

    /// Fetch and decode one record.
    pub fn get<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Decode every record of a table, in key order.
    pub fn scan<T: DeserializeOwned>(&self, table: JsonTable) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    /// Number of records in a table.
    pub fn count(&self, table: JsonTable) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.len()?)
    }

    /// Insert or replace a single record.
    pub fn put<T: Serialize>(&self, table: JsonTable, key: &str, value: &T) -> StorageResult<()> {
        self.write(|txn| txn.put(table, key, value))
    }

    /// Run `f` inside one write transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error aborts it
    /// and none of its writes become visible. redb allows a single writer at
    /// a time, so check-then-write sequences inside `f` are atomic.
    pub fn write<R>(&self, f: impl FnOnce(&WriteTxn) -> StorageResult<R>) -> StorageResult<R> {
        let txn = WriteTxn {
            inner: self.db.begin_write()?,
        };
        match f(&txn) {
            Ok(out) => {
                txn.inner.commit()?;
                Ok(out)
            }
            Err(e) => {
                if let Err(abort_err) = txn.inner.abort() {
                    tracing::warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(e)
            }
        }
    }

    /// Readiness check: a read transaction can be opened.
    pub fn is_ready(&self) -> bool {
        match self.db.begin_read() {
            Ok(txn) => txn.open_table(USERS).is_ok(),
            Err(_) => false,
        }
    }
}

/// Handle to an open write transaction.
///
/// Tables are opened per call and closed before returning, so calls can be
/// freely interleaved across tables.
pub struct WriteTxn {
    inner: redb::WriteTransaction,
}

impl WriteTxn {
    pub fn get<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StorageResult<Option<T>> {
        let table = self.inner.open_table(table)?;
        let bytes = match table.get(key)? {
            Some(value) => value.value().to_vec(),
            None => return Ok(None),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn contains(&self, table: JsonTable, key: &str) -> StorageResult<bool> {
        let table = self.inner.open_table(table)?;
        let found = table.get(key)?.is_some();
        Ok(found)
    }

    pub fn scan<T: DeserializeOwned>(&self, table: JsonTable) -> StorageResult<Vec<T>> {
        let table = self.inner.open_table(table)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }

    pub fn put<T: Serialize>(&self, table: JsonTable, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_vec(value)?;
        let mut table = self.inner.open_table(table)?;
        table.insert(key, json.as_slice())?;
        Ok(())
    }

    /// Insert a record that must not exist yet.
    pub fn insert_new<T: Serialize>(
        &self,
        table: JsonTable,
        entity: &'static str,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        if self.contains(table, key)? {
            return Err(StorageError::AlreadyExists {
                entity,
                id: key.to_string(),
            });
        }
        self.put(table, key, value)
    }

    pub fn remove(&self, table: JsonTable, key: &str) -> StorageResult<bool> {
        let mut table = self.inner.open_table(table)?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }

    /// Read-modify-write of one record, failing with `NotFound` if absent.
    pub fn update<T, F>(&self, table: JsonTable, entity: &'static str, key: &str, f: F) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut record: T = self
            .get(table, key)?
            .ok_or_else(|| StorageError::not_found(entity, key))?;
        f(&mut record);
        self.put(table, key, &record)?;
        Ok(record)
    }
}
