// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin management of customer accounts.

use serde_json::json;

use super::{DeskError, DeskResult};
use crate::audit_log;
use crate::auth::Role;
use crate::storage::{AuditEvent, AuditEventType, Database, User, UserRepository, UserView};

#[derive(Debug, Clone)]
pub struct RmAssignment {
    pub rm_name: String,
    pub rm_phone: Option<String>,
    pub rm_whatsapp: Option<String>,
}

/// Customer accounts, oldest first. Admins are not listed.
pub fn list_customers(db: &Database) -> DeskResult<Vec<UserView>> {
    Ok(UserRepository::new(db)
        .list_all()?
        .iter()
        .filter(|u| u.role == Role::User)
        .map(UserView::from)
        .collect())
}

pub fn set_frozen(db: &Database, admin_id: &str, user_id: &str, frozen: bool) -> DeskResult<User> {
    if frozen && admin_id == user_id {
        return Err(DeskError::Validation("Admins cannot freeze themselves".into()));
    }
    let user = UserRepository::new(db).update(user_id, |u| u.is_frozen = frozen)?;

    let event_type = if frozen {
        AuditEventType::UserFrozen
    } else {
        AuditEventType::UserUnfrozen
    };
    audit_log!(db, event_type, admin_id, "user", user_id);
    tracing::info!(user_id = %user_id, admin_id = %admin_id, frozen, "Account freeze updated");
    Ok(user)
}

pub fn assign_rm(
    db: &Database,
    admin_id: &str,
    user_id: &str,
    assignment: RmAssignment,
) -> DeskResult<User> {
    let rm_name = assignment.rm_name.trim().to_string();
    if rm_name.is_empty() {
        return Err(DeskError::Validation("rm_name is required".into()));
    }
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let rm_phone = clean(assignment.rm_phone);
    let rm_whatsapp = clean(assignment.rm_whatsapp);

    let user = UserRepository::new(db).update(user_id, |u| {
        u.relationship_manager = Some(rm_name);
        u.rm_phone = rm_phone;
        u.rm_whatsapp = rm_whatsapp;
    })?;

    let event = AuditEvent::new(AuditEventType::RelationshipManagerAssigned)
        .with_user(admin_id)
        .with_resource("user", user_id)
        .with_details(json!({ "relationship_manager": user.relationship_manager }));
    audit_log!(@write db, event);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::testutil;
    use crate::storage::KycStatus;

    #[test]
    fn customer_list_excludes_admins() {
        let (_dir, db) = testutil::db();
        testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);

        let listed = list_customers(&db).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, user.id);
        let json = serde_json::to_value(&listed[0]).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn freeze_and_unfreeze() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);

        assert!(set_frozen(&db, &admin.id, &user.id, true).unwrap().is_frozen);
        assert!(!set_frozen(&db, &admin.id, &user.id, false).unwrap().is_frozen);
        assert!(matches!(
            set_frozen(&db, &admin.id, &admin.id, true),
            Err(DeskError::Validation(_))
        ));
        assert!(matches!(
            set_frozen(&db, &admin.id, "ghost", true),
            Err(DeskError::NotFound(_))
        ));
    }

    #[test]
    fn relationship_manager_is_stored() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Pending);

        let assignment = RmAssignment {
            rm_name: " Priya ".into(),
            rm_phone: Some("+919811111111".into()),
            rm_whatsapp: Some("".into()),
        };
        let updated = assign_rm(&db, &admin.id, &user.id, assignment).unwrap();
        assert_eq!(updated.relationship_manager.as_deref(), Some("Priya"));
        assert_eq!(updated.rm_phone.as_deref(), Some("+919811111111"));
        assert!(updated.rm_whatsapp.is_none());
    }
}
