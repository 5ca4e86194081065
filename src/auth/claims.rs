// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};

use super::roles::Role;
use crate::storage::User;

/// Claims carried by desk bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
}

/// Authenticated user information.
///
/// Built from a verified token and the stored user record. The role is the
/// stored one, never a claim, so demotions take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Canonical user ID (token `sub`)
    pub user_id: String,
    pub role: Role,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
    /// Stored user record as loaded for this request.
    pub profile: User,
}

impl AuthenticatedUser {
    pub fn new(claims: Claims, profile: User) -> Self {
        Self {
            user_id: claims.sub,
            role: profile.role,
            expires_at: claims.exp,
            profile,
        }
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(role: Role) -> AuthenticatedUser {
        let mut profile = User::new("+919800000001".into(), "a@example.com".into(), "h".into());
        profile.role = role;
        let claims = Claims {
            sub: profile.id.clone(),
            iat: 1_700_000_000,
            exp: 1_700_604_800,
        };
        AuthenticatedUser::new(claims, profile)
    }

    #[test]
    fn role_comes_from_profile() {
        let user = sample(Role::Admin);
        assert!(user.is_admin());
        assert!(user.has_role(Role::User));
        assert_eq!(user.user_id, user.profile.id);
        assert_eq!(user.expires_at, 1_700_604_800);
    }

    #[test]
    fn user_lacks_admin_privilege() {
        let user = sample(Role::User);
        assert!(!user.is_admin());
        assert!(!user.has_role(Role::Admin));
    }
}
