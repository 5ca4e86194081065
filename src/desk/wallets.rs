// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Saved withdrawal wallets and their admin verification.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{normalize_asset, DeskError, DeskResult, ReviewAction};
use crate::audit_log;
use crate::auth::AuthenticatedUser;
use crate::storage::{
    AuditEvent, AuditEventType, Database, OwnershipCheck, PrimaryChange, SavedWallet,
    SavedWalletRepository, StorageError, User, UserRepository, UserView, VerificationStatus,
};

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub asset: String,
    pub network: String,
    pub wallet_address: String,
    pub label: String,
    pub proof_image: Option<String>,
}

/// A wallet with its owner's contact details.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletWithOwner {
    #[serde(flatten)]
    pub wallet: SavedWallet,
    pub user_email: Option<String>,
    pub user_mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletDetail {
    #[serde(flatten)]
    pub wallet: SavedWallet,
    pub user: Option<UserView>,
}

pub fn save(db: &Database, user_id: &str, input: NewWallet) -> DeskResult<SavedWallet> {
    let asset = normalize_asset(&input.asset)?;
    let wallet_address = input.wallet_address.trim().to_string();
    let network = input.network.trim().to_string();
    if wallet_address.is_empty() {
        return Err(DeskError::Validation("Wallet address is required".into()));
    }
    if network.is_empty() {
        return Err(DeskError::Validation("Network is required".into()));
    }

    let wallet = SavedWallet {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        asset,
        network,
        wallet_address,
        label: input.label.trim().to_string(),
        proof_image: input.proof_image.filter(|p| !p.trim().is_empty()),
        verification_status: VerificationStatus::Pending,
        is_primary: false,
        admin_notes: None,
        verified_by: None,
        verified_at: None,
        created_at: Utc::now(),
    };
    SavedWalletRepository::new(db)
        .create(&wallet)
        .map_err(|e| match e {
            StorageError::AlreadyExists { .. } => DeskError::DuplicateWallet,
            other => other.into(),
        })?;

    audit_log!(db, AuditEventType::WalletSaved, user_id, "wallet", &wallet.id);
    tracing::info!(wallet_id = %wallet.id, user_id = %user_id, asset = %wallet.asset, "Wallet saved");
    Ok(wallet)
}

/// Wallets of a user, newest first.
pub fn list(db: &Database, user_id: &str) -> DeskResult<Vec<SavedWallet>> {
    Ok(SavedWalletRepository::new(db).list_by_user(user_id)?)
}

pub fn list_verified(db: &Database, user_id: &str) -> DeskResult<Vec<SavedWallet>> {
    Ok(list(db, user_id)?
        .into_iter()
        .filter(|w| w.verification_status == VerificationStatus::Verified)
        .collect())
}

pub fn get(db: &Database, user: &AuthenticatedUser, wallet_id: &str) -> DeskResult<SavedWallet> {
    Ok(SavedWalletRepository::new(db)
        .find(wallet_id)?
        .verify_owner(user, wallet_id)?)
}

pub fn delete(db: &Database, user: &AuthenticatedUser, wallet_id: &str) -> DeskResult<()> {
    get(db, user, wallet_id)?;
    SavedWalletRepository::new(db).delete(wallet_id)?;
    audit_log!(db, AuditEventType::WalletDeleted, &user.user_id, "wallet", wallet_id);
    Ok(())
}

/// Make an owned, verified wallet the primary one for its asset.
pub fn set_primary(db: &Database, user: &AuthenticatedUser, wallet_id: &str) -> DeskResult<SavedWallet> {
    get(db, user, wallet_id)?;
    match SavedWalletRepository::new(db).set_primary(wallet_id)? {
        PrimaryChange::Updated(wallet) => {
            tracing::info!(wallet_id = %wallet.id, asset = %wallet.asset, "Primary wallet updated");
            Ok(wallet)
        }
        PrimaryChange::NotVerified => Err(DeskError::Validation(
            "Only verified wallets can be set as primary".into(),
        )),
    }
}

pub fn review(
    db: &Database,
    admin_id: &str,
    wallet_id: &str,
    action: ReviewAction,
    notes: Option<String>,
) -> DeskResult<SavedWallet> {
    let status = match action {
        ReviewAction::Approve => VerificationStatus::Verified,
        ReviewAction::Reject => VerificationStatus::Rejected,
    };
    let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let wallet = SavedWalletRepository::new(db).review(wallet_id, status, admin_id, notes)?;

    let event = AuditEvent::new(AuditEventType::WalletReviewed)
        .with_user(admin_id)
        .with_resource("wallet", &wallet.id)
        .with_details(json!({ "user_id": wallet.user_id, "status": status }));
    audit_log!(@write db, event);
    tracing::info!(wallet_id = %wallet.id, status = ?status, admin_id = %admin_id, "Wallet reviewed");
    Ok(wallet)
}

pub fn list_pending(db: &Database) -> DeskResult<Vec<WalletWithOwner>> {
    with_owners(
        db,
        SavedWalletRepository::new(db)
            .list_all()?
            .into_iter()
            .filter(|w| w.verification_status == VerificationStatus::Pending)
            .collect(),
    )
}

pub fn list_all(db: &Database) -> DeskResult<Vec<WalletWithOwner>> {
    with_owners(db, SavedWalletRepository::new(db).list_all()?)
}

fn with_owners(db: &Database, wallets: Vec<SavedWallet>) -> DeskResult<Vec<WalletWithOwner>> {
    let owners: HashMap<String, User> = UserRepository::new(db)
        .list_all()?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();
    Ok(wallets
        .into_iter()
        .map(|wallet| {
            let owner = owners.get(&wallet.user_id);
            WalletWithOwner {
                user_email: owner.map(|u| u.email.clone()),
                user_mobile: owner.map(|u| u.mobile.clone()),
                wallet,
            }
        })
        .collect())
}

pub fn detail(db: &Database, wallet_id: &str) -> DeskResult<WalletDetail> {
    let wallet = SavedWalletRepository::new(db).get(wallet_id)?;
    let user = UserRepository::new(db)
        .find(&wallet.user_id)?
        .as_ref()
        .map(UserView::from);
    Ok(WalletDetail { wallet, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::testutil;
    use crate::storage::KycStatus;

    fn usdt(address: &str) -> NewWallet {
        NewWallet {
            asset: "usdt".into(),
            network: "TRC20".into(),
            wallet_address: address.into(),
            label: "Main".into(),
            proof_image: None,
        }
    }

    fn primaries(db: &Database, user_id: &str, asset: &str) -> usize {
        list(db, user_id)
            .unwrap()
            .iter()
            .filter(|w| w.asset == asset && w.is_primary)
            .count()
    }

    #[test]
    fn same_address_twice_is_a_duplicate() {
        let (_dir, db) = testutil::db();
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let other = testutil::user(&db, "+919800000002", KycStatus::Approved);

        let wallet = save(&db, &user.id, usdt("TXabc")).unwrap();
        assert_eq!(wallet.asset, "USDT");
        assert_eq!(wallet.verification_status, VerificationStatus::Pending);
        assert!(matches!(
            save(&db, &user.id, usdt("TXabc")),
            Err(DeskError::DuplicateWallet)
        ));
        // Another user may save the same address.
        assert!(save(&db, &other.id, usdt("TXabc")).is_ok());
    }

    #[test]
    fn only_verified_wallets_become_primary() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let authed = testutil::authed(&user);
        let wallet = save(&db, &user.id, usdt("TXabc")).unwrap();

        assert!(matches!(
            set_primary(&db, &authed, &wallet.id),
            Err(DeskError::Validation(_))
        ));

        review(&db, &admin.id, &wallet.id, ReviewAction::Approve, None).unwrap();
        assert!(set_primary(&db, &authed, &wallet.id).unwrap().is_primary);
        assert_eq!(list_verified(&db, &user.id).unwrap().len(), 1);
    }

    #[test]
    fn one_primary_per_user_and_asset() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let authed = testutil::authed(&user);

        let ids: Vec<String> = ["TXa", "TXb", "TXc"]
            .into_iter()
            .map(|address| {
                let wallet = save(&db, &user.id, usdt(address)).unwrap();
                review(&db, &admin.id, &wallet.id, ReviewAction::Approve, None).unwrap();
                wallet.id
            })
            .collect();
        let mut btc = usdt("bc1q");
        btc.asset = "BTC".into();
        let btc = save(&db, &user.id, btc).unwrap();
        review(&db, &admin.id, &btc.id, ReviewAction::Approve, None).unwrap();
        set_primary(&db, &authed, &btc.id).unwrap();

        for id in &ids {
            set_primary(&db, &authed, id).unwrap();
            assert_eq!(primaries(&db, &user.id, "USDT"), 1);
        }
        assert_eq!(primaries(&db, &user.id, "BTC"), 1);
        assert!(get(&db, &authed, &ids[2]).unwrap().is_primary);
    }

    #[test]
    fn rejecting_primary_wallet_clears_flag() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let wallet = save(&db, &user.id, usdt("TXabc")).unwrap();
        review(&db, &admin.id, &wallet.id, ReviewAction::Approve, None).unwrap();
        set_primary(&db, &testutil::authed(&user), &wallet.id).unwrap();

        let rejected = review(
            &db,
            &admin.id,
            &wallet.id,
            ReviewAction::Reject,
            Some("address mismatch".into()),
        )
        .unwrap();
        assert_eq!(rejected.verification_status, VerificationStatus::Rejected);
        assert!(!rejected.is_primary);
        assert_eq!(rejected.admin_notes.as_deref(), Some("address mismatch"));
        assert_eq!(rejected.verified_by.as_deref(), Some(admin.id.as_str()));
    }

    #[test]
    fn other_users_cannot_touch_a_wallet() {
        let (_dir, db) = testutil::db();
        let owner = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let other = testutil::authed(&testutil::user(&db, "+919800000002", KycStatus::Approved));
        let wallet = save(&db, &owner.id, usdt("TXabc")).unwrap();

        assert!(matches!(get(&db, &other, &wallet.id), Err(DeskError::Forbidden(_))));
        assert!(matches!(delete(&db, &other, &wallet.id), Err(DeskError::Forbidden(_))));

        delete(&db, &testutil::authed(&owner), &wallet.id).unwrap();
        assert!(matches!(
            get(&db, &testutil::authed(&owner), &wallet.id),
            Err(DeskError::NotFound(_))
        ));
    }

    #[test]
    fn admin_views_include_owner() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let first = save(&db, &user.id, usdt("TXa")).unwrap();
        save(&db, &user.id, usdt("TXb")).unwrap();
        review(&db, &admin.id, &first.id, ReviewAction::Approve, None).unwrap();

        let pending = list_pending(&db).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].wallet.wallet_address, "TXb");
        assert_eq!(pending[0].user_email.as_deref(), Some("+919800000001@example.com"));
        assert_eq!(list_all(&db).unwrap().len(), 2);

        let shown = detail(&db, &first.id).unwrap();
        assert_eq!(shown.user.unwrap().mobile, "+919800000001");
        assert!(matches!(detail(&db, "nope"), Err(DeskError::NotFound(_))));
    }
}
