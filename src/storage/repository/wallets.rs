// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Saved withdrawal wallets.
//!
//! A user may save many addresses per asset; once an admin verifies one it
//! can be made the primary address for that asset. At most one wallet per
//! (user, asset) is primary at any commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{Database, SAVED_WALLETS};
use crate::storage::{OwnedResource, StorageError, StorageResult};

/// Admin verification state of a saved wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SavedWallet {
    pub id: String,
    pub user_id: String,
    pub asset: String,
    pub network: String,
    pub wallet_address: String,
    pub label: String,
    pub proof_image: Option<String>,
    pub verification_status: VerificationStatus,
    pub is_primary: bool,
    pub admin_notes: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for SavedWallet {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug)]
pub enum PrimaryChange {
    Updated(SavedWallet),
    /// Only verified wallets can become primary.
    NotVerified,
}

pub struct SavedWalletRepository<'a> {
    db: &'a Database,
}

impl<'a> SavedWalletRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn get(&self, wallet_id: &str) -> StorageResult<SavedWallet> {
        self.db
            .get(SAVED_WALLETS, wallet_id)?
            .ok_or_else(|| StorageError::not_found("wallet", wallet_id))
    }

    pub fn find(&self, wallet_id: &str) -> StorageResult<Option<SavedWallet>> {
        self.db.get(SAVED_WALLETS, wallet_id)
    }

    /// Save a wallet unless the user already saved the same address.
    pub fn create(&self, wallet: &SavedWallet) -> StorageResult<()> {
        self.db.write(|txn| {
            let duplicate = txn
                .scan::<SavedWallet>(SAVED_WALLETS)?
                .iter()
                .any(|w| w.user_id == wallet.user_id && w.wallet_address == wallet.wallet_address);
            if duplicate {
                return Err(StorageError::AlreadyExists {
                    entity: "wallet",
                    id: wallet.wallet_address.clone(),
                });
            }
            txn.put(SAVED_WALLETS, &wallet.id, wallet)
        })
    }

    pub fn delete(&self, wallet_id: &str) -> StorageResult<()> {
        let removed = self.db.write(|txn| txn.remove(SAVED_WALLETS, wallet_id))?;
        if removed {
            Ok(())
        } else {
            Err(StorageError::not_found("wallet", wallet_id))
        }
    }

    /// Make `wallet_id` the only primary wallet for its (user, asset).
    ///
    /// Clearing the other flags and setting the target happen in one write
    /// transaction, so readers never observe zero or two primaries midway.
    pub fn set_primary(&self, wallet_id: &str) -> StorageResult<PrimaryChange> {
        self.db.write(|txn| {
            let target: SavedWallet = txn
                .get(SAVED_WALLETS, wallet_id)?
                .ok_or_else(|| StorageError::not_found("wallet", wallet_id))?;
            if target.verification_status != VerificationStatus::Verified {
                return Ok(PrimaryChange::NotVerified);
            }

            for mut other in txn.scan::<SavedWallet>(SAVED_WALLETS)? {
                if other.id != target.id
                    && other.is_primary
                    && other.user_id == target.user_id
                    && other.asset == target.asset
                {
                    other.is_primary = false;
                    txn.put(SAVED_WALLETS, &other.id, &other)?;
                }
            }

            let updated = txn.update(SAVED_WALLETS, "wallet", wallet_id, |w: &mut SavedWallet| {
                w.is_primary = true
            })?;
            Ok(PrimaryChange::Updated(updated))
        })
    }

    /// Record an admin verification decision.
    ///
    /// A wallet that is no longer verified also loses its primary flag.
    pub fn review(
        &self,
        wallet_id: &str,
        status: VerificationStatus,
        admin_id: &str,
        notes: Option<String>,
    ) -> StorageResult<SavedWallet> {
        self.db.write(|txn| {
            txn.update(SAVED_WALLETS, "wallet", wallet_id, |w: &mut SavedWallet| {
                w.verification_status = status;
                w.admin_notes = notes;
                w.verified_by = Some(admin_id.to_string());
                w.verified_at = Some(Utc::now());
                if status != VerificationStatus::Verified {
                    w.is_primary = false;
                }
            })
        })
    }

    /// Wallets of one user, newest first.
    pub fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<SavedWallet>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|w| w.user_id == user_id)
            .collect())
    }

    /// All wallets, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<SavedWallet>> {
        let mut wallets: Vec<SavedWallet> = self.db.scan(SAVED_WALLETS)?;
        wallets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        (dir, db)
    }

    fn wallet(user: &str, asset: &str, address: &str) -> SavedWallet {
        SavedWallet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.into(),
            asset: asset.into(),
            network: "TRC20".into(),
            wallet_address: address.into(),
            label: "main".into(),
            proof_image: None,
            verification_status: VerificationStatus::Pending,
            is_primary: false,
            admin_notes: None,
            verified_by: None,
            verified_at: None,
            created_at: Utc::now(),
        }
    }

    fn primaries(db: &Database, user: &str, asset: &str) -> usize {
        SavedWalletRepository::new(db)
            .list_by_user(user)
            .unwrap()
            .iter()
            .filter(|w| w.asset == asset && w.is_primary)
            .count()
    }

    #[test]
    fn duplicate_address_is_rejected_per_user() {
        let (_dir, db) = setup();
        let repo = SavedWalletRepository::new(&db);
        repo.create(&wallet("u1", "USDT", "T-addr")).unwrap();

        let dup = repo.create(&wallet("u1", "USDT", "T-addr"));
        assert!(matches!(dup, Err(StorageError::AlreadyExists { .. })));

        // Another user may save the same address
        repo.create(&wallet("u2", "USDT", "T-addr")).unwrap();
    }

    #[test]
    fn set_primary_keeps_a_single_primary_per_asset() {
        let (_dir, db) = setup();
        let repo = SavedWalletRepository::new(&db);
        let a = wallet("u1", "USDT", "addr-a");
        let b = wallet("u1", "USDT", "addr-b");
        let c = wallet("u1", "BTC", "addr-c");
        for w in [&a, &b, &c] {
            repo.create(w).unwrap();
            repo.review(&w.id, VerificationStatus::Verified, "admin", None).unwrap();
        }

        repo.set_primary(&a.id).unwrap();
        repo.set_primary(&c.id).unwrap();
        repo.set_primary(&b.id).unwrap();

        assert_eq!(primaries(&db, "u1", "USDT"), 1);
        assert!(repo.get(&b.id).unwrap().is_primary);
        assert!(!repo.get(&a.id).unwrap().is_primary);
        // Other assets are untouched
        assert!(repo.get(&c.id).unwrap().is_primary);
    }

    #[test]
    fn unverified_wallet_cannot_be_primary() {
        let (_dir, db) = setup();
        let repo = SavedWalletRepository::new(&db);
        let w = wallet("u1", "USDT", "addr");
        repo.create(&w).unwrap();

        assert!(matches!(repo.set_primary(&w.id).unwrap(), PrimaryChange::NotVerified));
        assert_eq!(primaries(&db, "u1", "USDT"), 0);
    }

    #[test]
    fn rejecting_a_primary_wallet_clears_the_flag() {
        let (_dir, db) = setup();
        let repo = SavedWalletRepository::new(&db);
        let w = wallet("u1", "USDT", "addr");
        repo.create(&w).unwrap();
        repo.review(&w.id, VerificationStatus::Verified, "admin", None).unwrap();
        repo.set_primary(&w.id).unwrap();

        let rejected = repo
            .review(&w.id, VerificationStatus::Rejected, "admin", Some("wrong network".into()))
            .unwrap();
        assert!(!rejected.is_primary);
        assert_eq!(rejected.admin_notes.as_deref(), Some("wrong network"));
    }

    #[test]
    fn delete_missing_wallet_is_not_found() {
        let (_dir, db) = setup();
        let repo = SavedWalletRepository::new(&db);
        assert!(matches!(repo.delete("nope"), Err(StorageError::NotFound { .. })));
    }
}
