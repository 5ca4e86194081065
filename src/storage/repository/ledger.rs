// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only wallet ledger.
//!
//! Entries are never updated or deleted. Order-linked entries are unique
//! per order through `ledger_order_index`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{Database, WriteTxn, LEDGER_ORDER_INDEX, WALLET_LEDGER};
use crate::storage::{OwnedResource, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

/// What produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LedgerReference {
    /// Settlement of a completed order (`order_id` is set).
    Order,
    /// Manual adjustment by an admin (`created_by` is set).
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    pub asset: String,
    pub transaction_type: TransactionType,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub description: String,
    pub reference: LedgerReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed contribution of this entry to its asset balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}

impl OwnedResource for LedgerEntry {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

/// Insert an order-linked entry unless one already exists for the order.
///
/// Must run inside the transaction that completes the order. Returns
/// `false` when the order already has its entry.
pub(crate) fn insert_order_entry(txn: &WriteTxn, entry: &LedgerEntry) -> StorageResult<bool> {
    let Some(order_id) = entry.order_id.as_deref() else {
        return Ok(false);
    };
    if txn.contains(LEDGER_ORDER_INDEX, order_id)? {
        return Ok(false);
    }
    txn.put(LEDGER_ORDER_INDEX, order_id, &entry.id)?;
    txn.put(WALLET_LEDGER, &entry.id, entry)?;
    Ok(true)
}

pub struct LedgerRepository<'a> {
    db: &'a Database,
}

impl<'a> LedgerRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an entry that is not tied to an order.
    pub fn append(&self, entry: &LedgerEntry) -> StorageResult<()> {
        self.db
            .write(|txn| txn.insert_new(WALLET_LEDGER, "ledger entry", &entry.id, entry))
    }

    /// The entry settling `order_id`, if any.
    pub fn find_by_order(&self, order_id: &str) -> StorageResult<Option<LedgerEntry>> {
        match self.db.get::<String>(LEDGER_ORDER_INDEX, order_id)? {
            Some(entry_id) => self.db.get(WALLET_LEDGER, &entry_id),
            None => Ok(None),
        }
    }

    /// All entries of a user, newest first.
    pub fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .db
            .scan::<LedgerEntry>(WALLET_LEDGER)?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    pub fn list_all(&self) -> StorageResult<Vec<LedgerEntry>> {
        self.db.scan(WALLET_LEDGER)
    }
}
