// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time codes for registration and two-factor login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{Database, OTP_STORE};
use crate::storage::StorageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OtpPurpose {
    #[serde(rename = "registration")]
    Registration,
    #[serde(rename = "2fa")]
    TwoFactor,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::TwoFactor => "2fa",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    pub id: String,
    /// Email for registration codes, mobile for 2FA codes.
    pub identifier: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    Consumed,
    /// The code matched an unused record whose window has passed.
    Expired,
    /// No unused record matches.
    Invalid,
}

pub struct OtpRepository<'a> {
    db: &'a Database,
}

impl<'a> OtpRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store a new code, dropping spent or expired codes of the same identifier.
    pub fn issue(&self, record: &OtpRecord) -> StorageResult<()> {
        let now = Utc::now();
        self.db.write(|txn| {
            for old in txn.scan::<OtpRecord>(OTP_STORE)? {
                if old.identifier == record.identifier && (old.is_used || old.is_expired(now)) {
                    txn.remove(OTP_STORE, &old.id)?;
                }
            }
            txn.insert_new(OTP_STORE, "otp", &record.id, record)
        })
    }

    /// Mark a matching unused code as used.
    ///
    /// Lookup and mark happen in one write transaction, so a code can be
    /// consumed at most once even under concurrent verification.
    pub fn consume(
        &self,
        identifier: &str,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> StorageResult<OtpOutcome> {
        self.db.write(|txn| {
            let candidate = txn
                .scan::<OtpRecord>(OTP_STORE)?
                .into_iter()
                .filter(|r| {
                    !r.is_used && r.identifier == identifier && r.code == code && r.purpose == purpose
                })
                .max_by_key(|r| r.created_at);

            let Some(mut record) = candidate else {
                return Ok(OtpOutcome::Invalid);
            };
            if record.is_expired(now) {
                return Ok(OtpOutcome::Expired);
            }
            record.is_used = true;
            txn.put(OTP_STORE, &record.id, &record)?;
            Ok(OtpOutcome::Consumed)
        })
    }

    /// Most recent record for an identifier, used or not.
    #[cfg(test)]
    pub fn latest_for(&self, identifier: &str) -> StorageResult<Option<OtpRecord>> {
        Ok(self
            .db
            .scan::<OtpRecord>(OTP_STORE)?
            .into_iter()
            .filter(|r| r.identifier == identifier)
            .max_by_key(|r| r.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(identifier: &str, code: &str, expires_in: Duration) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: identifier.into(),
            code: code.into(),
            purpose: OtpPurpose::Registration,
            created_at: now,
            expires_at: now + expires_in,
            is_used: false,
        }
    }

    fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn code_is_single_use() {
        let (_dir, db) = setup();
        let repo = OtpRepository::new(&db);
        repo.issue(&record("a@example.com", "123456", Duration::minutes(10)))
            .unwrap();

        let now = Utc::now();
        let first = repo.consume("a@example.com", "123456", OtpPurpose::Registration, now);
        assert_eq!(first.unwrap(), OtpOutcome::Consumed);
        let second = repo.consume("a@example.com", "123456", OtpPurpose::Registration, now);
        assert_eq!(second.unwrap(), OtpOutcome::Invalid);
    }

    #[test]
    fn expired_code_is_rejected_even_when_it_matches() {
        let (_dir, db) = setup();
        let repo = OtpRepository::new(&db);
        repo.issue(&record("a@example.com", "123456", Duration::minutes(10)))
            .unwrap();

        let later = Utc::now() + Duration::minutes(11);
        let outcome = repo
            .consume("a@example.com", "123456", OtpPurpose::Registration, later)
            .unwrap();
        assert_eq!(outcome, OtpOutcome::Expired);
    }

    #[test]
    fn wrong_code_or_purpose_is_invalid() {
        let (_dir, db) = setup();
        let repo = OtpRepository::new(&db);
        repo.issue(&record("a@example.com", "123456", Duration::minutes(10)))
            .unwrap();

        let now = Utc::now();
        assert_eq!(
            repo.consume("a@example.com", "000000", OtpPurpose::Registration, now).unwrap(),
            OtpOutcome::Invalid
        );
        assert_eq!(
            repo.consume("a@example.com", "123456", OtpPurpose::TwoFactor, now).unwrap(),
            OtpOutcome::Invalid
        );
    }

    #[test]
    fn issuing_drops_spent_codes() {
        let (_dir, db) = setup();
        let repo = OtpRepository::new(&db);
        repo.issue(&record("a@example.com", "111111", Duration::minutes(-1)))
            .unwrap();
        repo.issue(&record("a@example.com", "222222", Duration::minutes(10)))
            .unwrap();

        assert_eq!(db.count(OTP_STORE).unwrap(), 1);
        assert_eq!(repo.latest_for("a@example.com").unwrap().unwrap().code, "222222");
    }

    #[test]
    fn purpose_serializes_as_wire_names() {
        assert_eq!(serde_json::to_value(OtpPurpose::TwoFactor).unwrap(), "2fa");
        assert_eq!(
            serde_json::from_value::<OtpPurpose>("registration".into()).unwrap(),
            OtpPurpose::Registration
        );
    }
}
