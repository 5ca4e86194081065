// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KYC submission and admin review.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{DeskError, DeskResult, ReviewAction};
use crate::audit_log;
use crate::providers::{KycVerifier, ProviderError};
use crate::storage::{
    AccountType, AuditEvent, AuditEventType, Database, KycCheck, KycCheckKind, KycDetails,
    KycDocument, KycRepository, KycStatus, KycSubmission, User, UserRepository, UserView,
};

const IFSC_LEN: usize = 11;
const DEFAULT_REJECTION_REASON: &str = "Documents could not be verified";

/// What a user sees about their own verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KycStatusView {
    /// Document status, or `not_submitted`.
    pub status: String,
    pub kyc_status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// A pending document with its owner's contact details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingKyc {
    #[serde(flatten)]
    pub document: KycDocument,
    pub user_email: Option<String>,
    pub user_mobile: Option<String>,
}

/// A document with its owner, password hash excluded.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KycDetail {
    #[serde(flatten)]
    pub document: KycDocument,
    pub user: Option<UserView>,
}

pub fn submit(db: &Database, user: &User, details: KycDetails) -> DeskResult<KycDocument> {
    let details = validate(user, details)?;

    let document = match KycRepository::new(db).submit(&user.id, details)? {
        KycSubmission::AlreadyApproved => return Err(DeskError::AlreadyApproved),
        KycSubmission::Stored(document) => document,
    };

    audit_log!(db, AuditEventType::KycSubmitted, &user.id, "kyc", &document.id);
    tracing::info!(user_id = %user.id, kyc_id = %document.id, "KYC submitted");
    Ok(document)
}

/// Run the provider checks for a stored submission and attach the results.
///
/// Provider failures become unverified checks for the reviewing admin;
/// they never reject the submission.
pub async fn verify_submission(
    db: &Database,
    verifier: &KycVerifier,
    document: &KycDocument,
) -> DeskResult<KycDocument> {
    let details = &document.details;
    let mut checks = Vec::new();

    if let Some(pan) = non_empty(&details.pan_number) {
        let result = verifier.verify_pan(pan).await;
        checks.push(settle_check(verifier, KycCheckKind::Pan, result));
    }
    if let Some(aadhaar) = non_empty(&details.aadhaar_number) {
        let result = verifier.verify_aadhaar(aadhaar).await;
        checks.push(settle_check(verifier, KycCheckKind::Aadhaar, result));
    }
    let result = verifier
        .verify_bank_account(
            &details.bank_account_number,
            &details.bank_ifsc,
            &details.account_holder_name,
        )
        .await;
    checks.push(settle_check(verifier, KycCheckKind::BankAccount, result));

    let verified = checks.iter().filter(|c| c.verified).count();
    let total = checks.len();
    let updated = KycRepository::new(db).record_checks(&document.id, checks)?;
    tracing::info!(
        kyc_id = %document.id,
        provider = verifier.name(),
        verified,
        total,
        "KYC checks recorded"
    );
    Ok(updated)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn settle_check(
    verifier: &KycVerifier,
    kind: KycCheckKind,
    result: Result<KycCheck, ProviderError>,
) -> KycCheck {
    result.unwrap_or_else(|e| {
        tracing::warn!(kind = ?kind, provider = verifier.name(), error = %e, "KYC check failed");
        KycCheck {
            kind,
            provider: verifier.name().to_string(),
            verified: false,
            detail: Some(e.to_string()),
            checked_at: Utc::now(),
        }
    })
}

fn validate(user: &User, mut details: KycDetails) -> DeskResult<KycDetails> {
    for field in [
        &mut details.bank_account_number,
        &mut details.bank_ifsc,
        &mut details.bank_name,
        &mut details.bank_branch,
        &mut details.account_holder_name,
    ] {
        *field = field.trim().to_string();
    }
    details.bank_ifsc = details.bank_ifsc.to_ascii_uppercase();

    let bank = [
        ("bank_account_number", &details.bank_account_number),
        ("bank_ifsc", &details.bank_ifsc),
        ("bank_name", &details.bank_name),
        ("bank_branch", &details.bank_branch),
        ("account_holder_name", &details.account_holder_name),
    ];
    if let Some((name, _)) = bank.iter().find(|(_, value)| value.is_empty()) {
        return Err(DeskError::Validation(format!("{name} is required")));
    }
    if details.bank_ifsc.chars().count() != IFSC_LEN {
        return Err(DeskError::Validation(format!(
            "bank_ifsc must be {IFSC_LEN} characters"
        )));
    }

    let has_registration = details
        .company_registration_cert
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if user.account_type == AccountType::Corporate && !has_registration {
        return Err(DeskError::Validation(
            "company_registration_cert is required for corporate accounts".into(),
        ));
    }
    Ok(details)
}

pub fn status(db: &Database, user: &User) -> DeskResult<KycStatusView> {
    let view = match KycRepository::new(db).find_by_user(&user.id)? {
        Some(doc) => KycStatusView {
            status: doc.status.as_str().to_string(),
            kyc_status: user.kyc_status,
            submitted_at: Some(doc.submitted_at),
            rejection_reason: doc.rejection_reason,
        },
        None => KycStatusView {
            status: "not_submitted".into(),
            kyc_status: user.kyc_status,
            submitted_at: None,
            rejection_reason: None,
        },
    };
    Ok(view)
}

pub fn document(db: &Database, user_id: &str) -> DeskResult<KycDocument> {
    KycRepository::new(db)
        .find_by_user(user_id)?
        .ok_or_else(|| DeskError::NotFound("KYC".into()))
}

/// Record the decision on the document and the owner's `kyc_status`.
pub fn review(
    db: &Database,
    admin_id: &str,
    kyc_id: &str,
    action: ReviewAction,
    reason: Option<String>,
) -> DeskResult<(KycDocument, User)> {
    let (status, reason) = match action {
        ReviewAction::Approve => (KycStatus::Approved, None),
        ReviewAction::Reject => (
            KycStatus::Rejected,
            Some(
                reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
            ),
        ),
    };

    let (document, user) = KycRepository::new(db)
        .review(kyc_id, status, admin_id, reason)
        .map_err(|e| match DeskError::from(e) {
            DeskError::NotFound(_) => DeskError::NotFound("KYC".into()),
            other => other,
        })?;

    let event = AuditEvent::new(AuditEventType::KycReviewed)
        .with_user(admin_id)
        .with_resource("kyc", &document.id)
        .with_details(json!({ "user_id": user.id, "status": status }));
    audit_log!(@write db, event);
    tracing::info!(kyc_id = %kyc_id, user_id = %user.id, status = status.as_str(), "KYC reviewed");
    Ok((document, user))
}

/// Documents awaiting review, newest first.
pub fn list_pending(db: &Database) -> DeskResult<Vec<PendingKyc>> {
    let owners: HashMap<String, User> = UserRepository::new(db)
        .list_all()?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    Ok(KycRepository::new(db)
        .list_open()?
        .into_iter()
        .map(|document| {
            let owner = owners.get(&document.user_id);
            PendingKyc {
                user_email: owner.map(|u| u.email.clone()),
                user_mobile: owner.map(|u| u.mobile.clone()),
                document,
            }
        })
        .collect())
}

pub fn detail(db: &Database, kyc_id: &str) -> DeskResult<KycDetail> {
    let document = KycRepository::new(db)
        .get(kyc_id)
        .map_err(|e| match DeskError::from(e) {
            DeskError::NotFound(_) => DeskError::NotFound("KYC".into()),
            other => other,
        })?;
    let user = UserRepository::new(db)
        .find(&document.user_id)?
        .as_ref()
        .map(UserView::from);
    Ok(KycDetail { document, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::testutil;

    fn details() -> KycDetails {
        KycDetails {
            pan_number: Some("ABCDE1234F".into()),
            bank_account_number: "1234567890".into(),
            bank_ifsc: "hdfc0001234".into(),
            bank_name: "HDFC Bank".into(),
            bank_branch: "Andheri".into(),
            account_holder_name: "Asha Rao".into(),
            nominee_name: "Ravi Rao".into(),
            nominee_relationship: "Spouse".into(),
            nominee_dob: "1990-01-01".into(),
            ..Default::default()
        }
    }

    fn reload(db: &Database, user: &User) -> User {
        UserRepository::new(db).get(&user.id).unwrap()
    }

    #[test]
    fn submission_moves_user_under_review() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);

        assert_eq!(status(&db, &user).unwrap().status, "not_submitted");

        let doc = submit(&db, &user, details()).unwrap();
        assert_eq!(doc.status, KycStatus::UnderReview);
        assert_eq!(doc.details.bank_ifsc, "HDFC0001234");

        let user = reload(&db, &user);
        assert_eq!(user.kyc_status, KycStatus::UnderReview);
        let view = status(&db, &user).unwrap();
        assert_eq!(view.status, "under_review");
        assert!(view.submitted_at.is_some());
        assert_eq!(document(&db, &user.id).unwrap().id, doc.id);
    }

    #[tokio::test]
    async fn mock_checks_are_attached_to_the_submission() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let doc = submit(&db, &user, details()).unwrap();

        let checked = verify_submission(&db, &KycVerifier::Mock, &doc).await.unwrap();
        let kinds: Vec<_> = checked.verification.iter().map(|c| c.kind).collect();
        // No Aadhaar number was given, so only PAN and bank are checked
        assert_eq!(kinds, vec![KycCheckKind::Pan, KycCheckKind::BankAccount]);
        assert!(checked.verification.iter().all(|c| c.verified));
        assert_eq!(checked.status, KycStatus::UnderReview);
        assert_eq!(document(&db, &user.id).unwrap().verification.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_provider_records_unverified_checks() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let doc = submit(&db, &user, details()).unwrap();
        let verifier = KycVerifier::Signzy {
            base_url: "http://127.0.0.1:9".into(),
            api_key: "key".into(),
            http: reqwest::Client::new(),
        };

        let checked = verify_submission(&db, &verifier, &doc).await.unwrap();
        assert_eq!(checked.verification.len(), 2);
        assert!(checked.verification.iter().all(|c| !c.verified && c.detail.is_some()));
        assert_eq!(checked.status, KycStatus::UnderReview);
    }

    #[test]
    fn approved_kyc_cannot_be_resubmitted() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let doc = submit(&db, &user, details()).unwrap();

        let (_, owner) = review(&db, &admin.id, &doc.id, ReviewAction::Approve, None).unwrap();
        assert_eq!(owner.kyc_status, KycStatus::Approved);
        assert!(matches!(
            submit(&db, &owner, details()),
            Err(DeskError::AlreadyApproved)
        ));
    }

    #[test]
    fn rejected_kyc_can_be_resubmitted() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let doc = submit(&db, &user, details()).unwrap();

        let (rejected, owner) = review(
            &db,
            &admin.id,
            &doc.id,
            ReviewAction::Reject,
            Some("PAN unreadable".into()),
        )
        .unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("PAN unreadable"));
        assert_eq!(rejected.reviewed_by.as_deref(), Some(admin.id.as_str()));
        assert_eq!(owner.kyc_status, KycStatus::Rejected);
        assert_eq!(
            status(&db, &owner).unwrap().rejection_reason.as_deref(),
            Some("PAN unreadable")
        );

        let again = submit(&db, &owner, details()).unwrap();
        assert_eq!(again.id, doc.id);
        assert_eq!(again.status, KycStatus::UnderReview);
        assert!(again.rejection_reason.is_none());
    }

    #[test]
    fn bank_fields_are_validated() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);

        let mut missing = details();
        missing.bank_name = "  ".into();
        assert!(matches!(submit(&db, &user, missing), Err(DeskError::Validation(_))));

        let mut short_ifsc = details();
        short_ifsc.bank_ifsc = "HDFC01".into();
        assert!(matches!(submit(&db, &user, short_ifsc), Err(DeskError::Validation(_))));
    }

    #[test]
    fn corporate_accounts_need_registration_certificate() {
        let (_dir, db) = testutil::db();
        let mut user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        user = UserRepository::new(&db)
            .update(&user.id, |u| u.account_type = AccountType::Corporate)
            .unwrap();

        assert!(matches!(submit(&db, &user, details()), Err(DeskError::Validation(_))));

        let mut with_cert = details();
        with_cert.company_registration_cert = Some("data:application/pdf;base64,AAAA".into());
        assert!(submit(&db, &user, with_cert).is_ok());
    }

    #[test]
    fn pending_list_and_detail_include_owner() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let first = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let second = testutil::user(&db, "+919800000002", KycStatus::Pending);
        let doc = submit(&db, &first, details()).unwrap();
        let other = submit(&db, &second, details()).unwrap();
        review(&db, &admin.id, &other.id, ReviewAction::Approve, None).unwrap();

        let pending = list_pending(&db).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_mobile.as_deref(), Some("+919800000001"));

        let shown = detail(&db, &doc.id).unwrap();
        assert_eq!(shown.user.unwrap().id, first.id);
        assert!(matches!(detail(&db, "nope"), Err(DeskError::NotFound(_))));
        assert!(matches!(
            review(&db, &admin.id, "nope", ReviewAction::Approve, None),
            Err(DeskError::NotFound(_))
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);
        let err = document(&db, &user.id).unwrap_err();
        assert_eq!(err.to_string(), "KYC not found");
    }
}
