// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KYC documents: one active submission per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::users::User;
use crate::storage::database::{Database, KYC_DOCUMENTS, KYC_USER_INDEX, USERS};
use crate::storage::{OwnedResource, StorageError, StorageResult};

/// Verification state, shared by the document and the owning user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl KycStatus {
    /// Awaiting an admin decision.
    pub fn is_open(&self) -> bool {
        matches!(self, KycStatus::Pending | KycStatus::UnderReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::UnderReview => "under_review",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }
}

/// Identity, bank and nominee details submitted for verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct KycDetails {
    // Individual
    pub pan_number: Option<String>,
    pub pan_image: Option<String>,
    pub aadhaar_number: Option<String>,
    pub aadhaar_front: Option<String>,
    pub aadhaar_back: Option<String>,
    pub selfie_image: Option<String>,
    pub address_proof: Option<String>,
    pub passport_number: Option<String>,
    pub passport_image: Option<String>,
    // Corporate
    pub company_registration_cert: Option<String>,
    pub gst_certificate: Option<String>,
    pub board_resolution: Option<String>,
    pub authorized_signatory_id: Option<String>,
    pub authorized_signatory_name: Option<String>,
    // Bank
    pub bank_account_number: String,
    pub bank_ifsc: String,
    pub bank_name: String,
    pub bank_branch: String,
    pub account_holder_name: String,
    // Nominee
    pub nominee_name: String,
    pub nominee_relationship: String,
    pub nominee_dob: String,
}

/// Which identity fact a provider check covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycCheckKind {
    Pan,
    Aadhaar,
    BankAccount,
}

/// Result of one automated verification, kept for the reviewing admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycCheck {
    pub kind: KycCheckKind,
    /// Backend that ran the check (`mock` or `signzy`).
    pub provider: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct KycDocument {
    pub id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub details: KycDetails,
    pub status: KycStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
    /// Provider checks run against the latest submission.
    #[serde(default)]
    pub verification: Vec<KycCheck>,
}

impl OwnedResource for KycDocument {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

/// Result of a submission attempt.
#[derive(Debug)]
pub enum KycSubmission {
    /// The document was stored and the user moved to `under_review`.
    Stored(KycDocument),
    /// The existing submission is already approved; nothing was written.
    AlreadyApproved,
}

pub struct KycRepository<'a> {
    db: &'a Database,
}

impl<'a> KycRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn get(&self, kyc_id: &str) -> StorageResult<KycDocument> {
        self.db
            .get(KYC_DOCUMENTS, kyc_id)?
            .ok_or_else(|| StorageError::not_found("kyc document", kyc_id))
    }

    pub fn find_by_user(&self, user_id: &str) -> StorageResult<Option<KycDocument>> {
        match self.db.get::<String>(KYC_USER_INDEX, user_id)? {
            Some(kyc_id) => self.db.get(KYC_DOCUMENTS, &kyc_id),
            None => Ok(None),
        }
    }

    /// Insert or replace the user's submission and mark both the document
    /// and the user `under_review`, unless the current one is approved.
    pub fn submit(&self, user_id: &str, details: KycDetails) -> StorageResult<KycSubmission> {
        self.db.write(|txn| {
            let existing: Option<KycDocument> = match txn.get::<String>(KYC_USER_INDEX, user_id)? {
                Some(kyc_id) => txn.get(KYC_DOCUMENTS, &kyc_id)?,
                None => None,
            };
            if existing.as_ref().map(|d| d.status) == Some(KycStatus::Approved) {
                return Ok(KycSubmission::AlreadyApproved);
            }

            let document = KycDocument {
                id: existing
                    .map(|d| d.id)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                user_id: user_id.to_string(),
                details,
                status: KycStatus::UnderReview,
                submitted_at: Utc::now(),
                reviewed_at: None,
                reviewed_by: None,
                rejection_reason: None,
                verification: Vec::new(),
            };
            txn.put(KYC_DOCUMENTS, &document.id, &document)?;
            txn.put(KYC_USER_INDEX, user_id, &document.id)?;
            txn.update(USERS, "user", user_id, |u: &mut User| {
                u.kyc_status = KycStatus::UnderReview
            })?;
            Ok(KycSubmission::Stored(document))
        })
    }

    /// Record an admin decision on the document and mirror it onto the user.
    pub fn review(
        &self,
        kyc_id: &str,
        status: KycStatus,
        reviewer_id: &str,
        rejection_reason: Option<String>,
    ) -> StorageResult<(KycDocument, User)> {
        self.db.write(|txn| {
            let document = txn.update(KYC_DOCUMENTS, "kyc document", kyc_id, |d: &mut KycDocument| {
                d.status = status;
                d.reviewed_at = Some(Utc::now());
                d.reviewed_by = Some(reviewer_id.to_string());
                d.rejection_reason = rejection_reason;
            })?;
            let user = txn.update(USERS, "user", &document.user_id, |u: &mut User| {
                u.kyc_status = status
            })?;
            Ok((document, user))
        })
    }

    /// Attach provider checks to a document without touching its status.
    pub fn record_checks(&self, kyc_id: &str, checks: Vec<KycCheck>) -> StorageResult<KycDocument> {
        self.db.write(|txn| {
            txn.update(KYC_DOCUMENTS, "kyc document", kyc_id, |d: &mut KycDocument| {
                d.verification = checks
            })
        })
    }

    pub fn list_all(&self) -> StorageResult<Vec<KycDocument>> {
        let mut docs: Vec<KycDocument> = self.db.scan(KYC_DOCUMENTS)?;
        docs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(docs)
    }

    /// Submissions still awaiting a decision, newest first.
    pub fn list_open(&self) -> StorageResult<Vec<KycDocument>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|d| d.status.is_open())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::UserRepository;

    fn setup() -> (tempfile::TempDir, Database, User) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        let mut user = User::new("+919800000001".into(), "k@example.com".into(), "h".into());
        UserRepository::new(&db).create(&mut user).unwrap();
        (dir, db, user)
    }

    fn details() -> KycDetails {
        KycDetails {
            pan_number: Some("ABCDE1234F".into()),
            bank_account_number: "1234567890".into(),
            bank_ifsc: "HDFC0001234".into(),
            bank_name: "HDFC Bank".into(),
            bank_branch: "Mumbai".into(),
            account_holder_name: "Asha".into(),
            nominee_name: "Ravi".into(),
            nominee_relationship: "Brother".into(),
            nominee_dob: "1990-01-01".into(),
            ..Default::default()
        }
    }

    #[test]
    fn resubmission_replaces_the_same_document() {
        let (_dir, db, user) = setup();
        let repo = KycRepository::new(&db);

        let KycSubmission::Stored(first) = repo.submit(&user.id, details()).unwrap() else {
            panic!("first submission should be stored");
        };
        repo.review(&first.id, KycStatus::Rejected, "admin", Some("blurry".into()))
            .unwrap();

        let KycSubmission::Stored(second) = repo.submit(&user.id, details()).unwrap() else {
            panic!("resubmission after rejection should be stored");
        };
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, KycStatus::UnderReview);
        assert!(second.rejection_reason.is_none());
        assert_eq!(repo.list_all().unwrap().len(), 1);

        let stored_user = UserRepository::new(&db).get(&user.id).unwrap();
        assert_eq!(stored_user.kyc_status, KycStatus::UnderReview);
    }

    #[test]
    fn approved_submission_is_not_replaced() {
        let (_dir, db, user) = setup();
        let repo = KycRepository::new(&db);
        let KycSubmission::Stored(doc) = repo.submit(&user.id, details()).unwrap() else {
            panic!("submission should be stored");
        };
        let (_, reviewed_user) = repo.review(&doc.id, KycStatus::Approved, "admin", None).unwrap();
        assert_eq!(reviewed_user.kyc_status, KycStatus::Approved);

        assert!(matches!(
            repo.submit(&user.id, details()).unwrap(),
            KycSubmission::AlreadyApproved
        ));
        assert!(repo.list_open().unwrap().is_empty());
    }

    #[test]
    fn checks_are_recorded_and_cleared_on_resubmission() {
        let (_dir, db, user) = setup();
        let repo = KycRepository::new(&db);
        let KycSubmission::Stored(doc) = repo.submit(&user.id, details()).unwrap() else {
            panic!("submission should be stored");
        };
        let check = KycCheck {
            kind: KycCheckKind::Pan,
            provider: "mock".into(),
            verified: true,
            detail: None,
            checked_at: Utc::now(),
        };
        let updated = repo.record_checks(&doc.id, vec![check]).unwrap();
        assert_eq!(updated.verification.len(), 1);
        assert_eq!(updated.status, KycStatus::UnderReview);

        let KycSubmission::Stored(again) = repo.submit(&user.id, details()).unwrap() else {
            panic!("resubmission should be stored");
        };
        assert!(again.verification.is_empty());
    }

    #[test]
    fn details_are_flattened_in_json() {
        let (_dir, db, user) = setup();
        let repo = KycRepository::new(&db);
        let KycSubmission::Stored(doc) = repo.submit(&user.id, details()).unwrap() else {
            panic!("submission should be stored");
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["bank_ifsc"], "HDFC0001234");
        assert_eq!(json["status"], "under_review");
    }
}
