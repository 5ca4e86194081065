// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User accounts.
//!
//! Email and mobile are unique across all accounts. Uniqueness is enforced
//! through the `user_identities` table, written in the same transaction as
//! the user record itself. Each account also gets a sequential 7-digit
//! client id, allocated in that same transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::kyc::KycStatus;
use crate::auth::Role;
use crate::storage::database::{Database, USERS, USER_IDENTITIES};
use crate::storage::{StorageError, StorageResult};

/// Individual or corporate customer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Individual,
    Corporate,
}

/// Stored user record. Contains the password hash, so it is never
/// serialized to API clients directly; see [`UserView`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// 7-digit client number shown to customers and the desk.
    #[serde(default)]
    pub client_uid: String,
    pub mobile: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub account_type: AccountType,
    pub company_name: Option<String>,
    pub is_mobile_verified: bool,
    pub is_email_verified: bool,
    pub kyc_status: KycStatus,
    pub referral_code: Option<String>,
    pub invite_code: Option<String>,
    pub is_frozen: bool,
    pub relationship_manager: Option<String>,
    pub rm_phone: Option<String>,
    pub rm_whatsapp: Option<String>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// New unverified account with the `user` role.
    pub fn new(mobile: String, email: String, password_hash: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            client_uid: String::new(),
            mobile,
            email,
            password_hash,
            role: Role::User,
            account_type: AccountType::Individual,
            company_name: None,
            is_mobile_verified: false,
            is_email_verified: false,
            kyc_status: KycStatus::Pending,
            referral_code: None,
            invite_code: None,
            is_frozen: false,
            relationship_manager: None,
            rm_phone: None,
            rm_whatsapp: None,
            push_token: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: String,
    pub client_uid: String,
    pub mobile: String,
    pub email: String,
    pub role: Role,
    pub account_type: AccountType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub is_mobile_verified: bool,
    pub is_email_verified: bool,
    pub kyc_status: KycStatus,
    pub is_frozen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_manager: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rm_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rm_whatsapp: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            client_uid: user.client_uid.clone(),
            mobile: user.mobile.clone(),
            email: user.email.clone(),
            role: user.role,
            account_type: user.account_type,
            company_name: user.company_name.clone(),
            is_mobile_verified: user.is_mobile_verified,
            is_email_verified: user.is_email_verified,
            kyc_status: user.kyc_status,
            is_frozen: user.is_frozen,
            referral_code: user.referral_code.clone(),
            relationship_manager: user.relationship_manager.clone(),
            rm_phone: user.rm_phone.clone(),
            rm_whatsapp: user.rm_whatsapp.clone(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

const CLIENT_UID_SEQUENCE: &str = "sequence:client_uid";
const FIRST_CLIENT_UID: u32 = 1_000_001;

fn email_key(email: &str) -> String {
    format!("email:{email}")
}

fn mobile_key(mobile: &str) -> String {
    format!("mobile:{mobile}")
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Look up a user by ID.
    pub fn find(&self, user_id: &str) -> StorageResult<Option<User>> {
        self.db.get(USERS, user_id)
    }

    /// Get a user by ID, failing with `NotFound` if absent.
    pub fn get(&self, user_id: &str) -> StorageResult<User> {
        self.find(user_id)?
            .ok_or_else(|| StorageError::not_found("user", user_id))
    }

    /// Resolve an email or mobile number to a user.
    pub fn find_by_identifier(&self, identifier: &str) -> StorageResult<Option<User>> {
        for key in [email_key(identifier), mobile_key(identifier)] {
            if let Some(user_id) = self.db.get::<String>(USER_IDENTITIES, &key)? {
                return self.find(&user_id);
            }
        }
        Ok(None)
    }

    /// Create a user, claiming its email and mobile and assigning the next
    /// client id to `user.client_uid`.
    ///
    /// Fails with `AlreadyExists` if either identity is taken.
    pub fn create(&self, user: &mut User) -> StorageResult<()> {
        self.db.write(|txn| {
            txn.insert_new(USER_IDENTITIES, "email", &email_key(&user.email), &user.id)?;
            txn.insert_new(USER_IDENTITIES, "mobile", &mobile_key(&user.mobile), &user.id)?;

            let next = txn
                .get::<u32>(USER_IDENTITIES, CLIENT_UID_SEQUENCE)?
                .unwrap_or(FIRST_CLIENT_UID);
            txn.put(USER_IDENTITIES, CLIENT_UID_SEQUENCE, &(next + 1))?;
            user.client_uid = next.to_string();

            txn.insert_new(USERS, "user", &user.id, &*user)
        })
    }

    /// Apply `f` to a stored user and persist the result.
    pub fn update(&self, user_id: &str, f: impl FnOnce(&mut User)) -> StorageResult<User> {
        self.db.write(|txn| txn.update(USERS, "user", user_id, f))
    }

    /// All users, oldest first.
    pub fn list_all(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.db.scan(USERS)?;
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    pub fn any_admin(&self) -> StorageResult<bool> {
        Ok(self.list_all()?.iter().any(User::is_admin))
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

    fn sample_user(mobile: &str, email: &str) -> User {
        User::new(mobile.to_string(), email.to_string(), "hash".to_string())
    }

    #[test]
    fn create_and_resolve_by_email_or_mobile() {
        let (_dir, db) = setup();
        let repo = UserRepository::new(&db);
        let mut user = sample_user("+919800000001", "a@example.com");
        repo.create(&mut user).unwrap();

        assert_eq!(repo.find_by_identifier("a@example.com").unwrap().unwrap().id, user.id);
        assert_eq!(repo.find_by_identifier("+919800000001").unwrap().unwrap().id, user.id);
        assert!(repo.find_by_identifier("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_or_mobile_is_rejected() {
        let (_dir, db) = setup();
        let repo = UserRepository::new(&db);
        repo.create(&mut sample_user("+919800000001", "a@example.com")).unwrap();

        let same_email = repo.create(&mut sample_user("+919800000002", "a@example.com"));
        assert!(matches!(same_email, Err(StorageError::AlreadyExists { .. })));

        let same_mobile = repo.create(&mut sample_user("+919800000001", "b@example.com"));
        assert!(matches!(same_mobile, Err(StorageError::AlreadyExists { .. })));

        // The failed attempts must not leave a half-claimed identity behind
        assert!(repo.find_by_identifier("b@example.com").unwrap().is_none());
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn update_persists_changes() {
        let (_dir, db) = setup();
        let repo = UserRepository::new(&db);
        let mut user = sample_user("+919800000001", "a@example.com");
        repo.create(&mut user).unwrap();

        repo.update(&user.id, |u| u.is_frozen = true).unwrap();
        assert!(repo.get(&user.id).unwrap().is_frozen);
        assert!(!repo.any_admin().unwrap());
    }

    #[test]
    fn client_ids_are_sequential_seven_digit_numbers() {
        let (_dir, db) = setup();
        let repo = UserRepository::new(&db);
        let mut first = sample_user("+919800000001", "a@example.com");
        let mut second = sample_user("+919800000002", "b@example.com");
        repo.create(&mut first).unwrap();

        // A rejected duplicate does not consume a client id
        assert!(repo.create(&mut sample_user("+919800000001", "c@example.com")).is_err());
        repo.create(&mut second).unwrap();

        assert_eq!(first.client_uid, "1000001");
        assert_eq!(second.client_uid, "1000002");
        assert!(second.client_uid.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(repo.get(&second.id).unwrap().client_uid, "1000002");
    }

    #[test]
    fn user_view_omits_password_hash() {
        let user = sample_user("+919800000001", "a@example.com");
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["kyc_status"], "pending");
    }
}
