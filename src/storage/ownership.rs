// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for user-scoped records.
//!
//! Orders, wallets, KYC documents and ledger entries belong to exactly one
//! user. Handlers serving a user's own data pass the loaded record through
//! these checks before returning it.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Resource name used in permission errors.
    fn resource_name(&self) -> &'static str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("resource")
    }
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` if the user doesn't own the resource.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: self.resource_name().to_string(),
            })
        }
    }
}

/// Ownership check on a lookup that may have missed.
pub trait OwnershipCheck<T> {
    /// Return the resource if it exists and belongs to `user`.
    fn verify_owner(self, user: &AuthenticatedUser, id: &str) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for Option<T> {
    fn verify_owner(self, user: &AuthenticatedUser, id: &str) -> StorageResult<T> {
        let resource = self.ok_or_else(|| StorageError::not_found(short_type_name::<T>(), id))?;
        resource.verify_ownership(user)?;
        Ok(resource)
    }
}

fn short_type_name<T>() -> &'static str {
    std::any::type_name::<T>()
        .rsplit("::")
        .next()
        .unwrap_or("resource")
}
