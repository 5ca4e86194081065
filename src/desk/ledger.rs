// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balances and history over the append-only ledger.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use super::{normalize_asset, DeskError, DeskResult};
use crate::audit_log;
use crate::storage::{
    AuditEvent, AuditEventType, Database, LedgerEntry, LedgerReference, LedgerRepository,
    TransactionType, UserRepository,
};

#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub user_id: String,
    pub asset: String,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
}

/// Credits minus debits, per asset.
pub fn balance(db: &Database, user_id: &str) -> DeskResult<BTreeMap<String, Decimal>> {
    let mut balances = BTreeMap::new();
    for entry in LedgerRepository::new(db).list_by_user(user_id)? {
        let total = balances.entry(entry.asset.clone()).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(entry.signed_amount())
            .ok_or_else(|| DeskError::Internal(format!("{} balance out of range", entry.asset)))?;
    }
    Ok(balances)
}

/// Entries of a user, newest first.
pub fn history(db: &Database, user_id: &str) -> DeskResult<Vec<LedgerEntry>> {
    Ok(LedgerRepository::new(db).list_by_user(user_id)?)
}

pub fn manual_entry(db: &Database, admin_id: &str, input: ManualEntry) -> DeskResult<LedgerEntry> {
    UserRepository::new(db).get(&input.user_id)?;
    let asset = normalize_asset(&input.asset)?;
    if input.amount <= Decimal::ZERO {
        return Err(DeskError::Validation("Amount must be positive".into()));
    }

    let entry = LedgerEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: input.user_id,
        asset,
        transaction_type: input.transaction_type,
        amount: input.amount,
        description: format!("[Admin] {}", input.description.trim()),
        reference: LedgerReference::Manual,
        order_id: None,
        created_by: Some(admin_id.to_string()),
        created_at: Utc::now(),
    };
    let current = balance(db, &entry.user_id)?
        .get(&entry.asset)
        .copied()
        .unwrap_or(Decimal::ZERO);
    if current.checked_add(entry.signed_amount()).is_none() {
        return Err(DeskError::Validation(format!(
            "Entry would put the {} balance out of range",
            entry.asset
        )));
    }
    LedgerRepository::new(db).append(&entry)?;

    let event = AuditEvent::new(AuditEventType::LedgerEntryCreated)
        .with_user(admin_id)
        .with_resource("ledger_entry", &entry.id)
        .with_details(json!({
            "target_user": entry.user_id,
            "transaction_type": entry.transaction_type,
            "amount": entry.amount,
            "asset": entry.asset,
            "reference": "manual",
        }));
    audit_log!(@write db, event);
    tracing::info!(
        entry_id = %entry.id,
        user_id = %entry.user_id,
        admin_id = %admin_id,
        "Manual ledger entry added"
    );
    Ok(entry)
}
