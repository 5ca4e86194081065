// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-use password reset tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::users::User;
use crate::storage::database::{Database, PASSWORD_RESET_TOKENS, USERS};
use crate::storage::StorageResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The token was consumed and the password replaced.
    Applied { user_id: String },
    Expired,
    /// Unknown or already used.
    Invalid,
}

pub struct ResetTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> ResetTokenRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn store(&self, token: &PasswordResetToken) -> StorageResult<()> {
        self.db.write(|txn| {
            txn.insert_new(PASSWORD_RESET_TOKENS, "reset token", &token.token, token)
        })
    }

    pub fn find(&self, token: &str) -> StorageResult<Option<PasswordResetToken>> {
        self.db.get(PASSWORD_RESET_TOKENS, token)
    }

    /// Consume `token` and store `password_hash` on its user in one transaction.
    pub fn redeem(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<ResetOutcome> {
        self.db.write(|txn| {
            let Some(mut record) = txn.get::<PasswordResetToken>(PASSWORD_RESET_TOKENS, token)? else {
                return Ok(ResetOutcome::Invalid);
            };
            if record.is_used {
                return Ok(ResetOutcome::Invalid);
            }
            if record.expires_at <= now {
                return Ok(ResetOutcome::Expired);
            }

            record.is_used = true;
            txn.put(PASSWORD_RESET_TOKENS, token, &record)?;
            txn.update(USERS, "user", &record.user_id, |u: &mut User| {
                u.password_hash = password_hash.to_string()
            })?;
            Ok(ResetOutcome::Applied {
                user_id: record.user_id,
            })
        })
    }
}
