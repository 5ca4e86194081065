// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Authentication events, order settlements and all administrative actions
//! are appended to the `audit_events` table. Keys sort newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::database::{Database, AUDIT_EVENTS};
use super::StorageResult;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Account events
    UserRegistered,
    OtpVerified,
    PasswordReset,

    // Auth events
    AuthSuccess,
    AuthFailure,
    PermissionDenied,

    // Order events
    OrderCreated,
    OrderStatusChanged,
    LedgerEntryCreated,
    PaymentCaptured,

    // KYC events
    KycSubmitted,
    KycReviewed,

    // Wallet events
    WalletSaved,
    WalletDeleted,
    WalletReviewed,

    // Admin events
    UserFrozen,
    UserUnfrozen,
    RelationshipManagerAssigned,
    RateUpdated,
    DefaultDataSeeded,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Acting user, if known.
    pub user_id: Option<String>,
    /// Resource type (order, wallet, kyc, ...).
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_type: None,
            resource_id: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Table key; inverting the timestamp makes a forward scan newest first.
    fn storage_key(&self) -> String {
        let micros = self.timestamp.timestamp_micros().max(0);
        format!("{:020}|{}", i64::MAX - micros, self.event_id)
    }
}

/// Filter for [`AuditRepository::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub event_type: Option<AuditEventType>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditQuery {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1000;

    fn matches(&self, event: &AuditEvent) -> bool {
        fn eq(filter: &Option<String>, value: &Option<String>) -> bool {
            filter.is_none() || filter.as_deref() == value.as_deref()
        }
        eq(&self.user_id, &event.user_id)
            && eq(&self.resource_type, &event.resource_type)
            && eq(&self.resource_id, &event.resource_id)
            && self.event_type.is_none_or(|t| t == event.event_type)
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    db: &'a Database,
}

impl<'a> AuditRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an event.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        self.db.put(AUDIT_EVENTS, &event.storage_key(), event)
    }

    /// Matching events, newest first, paginated.
    pub fn query(&self, query: &AuditQuery) -> StorageResult<Vec<AuditEvent>> {
        let limit = query
            .limit
            .unwrap_or(AuditQuery::DEFAULT_LIMIT)
            .min(AuditQuery::MAX_LIMIT);
        Ok(self
            .db
            .scan::<AuditEvent>(AUDIT_EVENTS)?
            .into_iter()
            .filter(|e| query.matches(e))
            .skip(query.offset.unwrap_or(0))
            .take(limit)
            .collect())
    }
}

/// Append an audit event, logging instead of failing the request on error.
///
/// `audit_log!(db, event_type, user_id)` or
/// `audit_log!(db, event_type, user_id, resource_type, resource_id)`.
#[macro_export]
macro_rules! audit_log {
    (@write $db:expr, $event:expr) => {{
        if let Err(e) = $crate::storage::AuditRepository::new($db).log(&$event) {
            tracing::warn!(error = %e, event_type = ?$event.event_type, "Failed to write audit event");
        }
    }};
    ($db:expr, $event_type:expr, $user_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type).with_user($user_id);
        $crate::audit_log!(@write $db, event);
    }};
    ($db:expr, $event_type:expr, $user_id:expr, $resource_type:expr, $resource_id:expr) => {{
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user($user_id)
            .with_resource($resource_type, $resource_id);
        $crate::audit_log!(@write $db, event);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        (dir, db)
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::PermissionDenied)
            .with_user("user_123")
            .failed("Not authorized");

        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("Not authorized"));
    }

    #[test]
    fn query_returns_newest_first() {
        let (_dir, db) = setup();
        let repo = AuditRepository::new(&db);

        let mut older = AuditEvent::new(AuditEventType::OrderCreated).with_user("u1");
        older.timestamp = Utc::now() - Duration::minutes(5);
        let newer = AuditEvent::new(AuditEventType::OrderStatusChanged).with_user("u1");
        repo.log(&older).unwrap();
        repo.log(&newer).unwrap();

        let events = repo.query(&AuditQuery::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::OrderStatusChanged);
        assert_eq!(events[1].event_type, AuditEventType::OrderCreated);
    }

    #[test]
    fn query_filters_and_paginates() {
        let (_dir, db) = setup();
        let repo = AuditRepository::new(&db);

        for i in 0..5 {
            repo.log(
                &AuditEvent::new(AuditEventType::WalletSaved)
                    .with_user("target")
                    .with_resource("wallet", format!("w{i}")),
            )
            .unwrap();
        }
        repo.log(&AuditEvent::new(AuditEventType::KycSubmitted).with_user("other"))
            .unwrap();

        let by_user = AuditQuery {
            user_id: Some("target".into()),
            ..Default::default()
        };
        assert_eq!(repo.query(&by_user).unwrap().len(), 5);

        let by_type = AuditQuery {
            event_type: Some(AuditEventType::KycSubmitted),
            ..Default::default()
        };
        assert_eq!(repo.query(&by_type).unwrap().len(), 1);

        let by_resource = AuditQuery {
            resource_type: Some("wallet".into()),
            resource_id: Some("w3".into()),
            ..Default::default()
        };
        assert_eq!(repo.query(&by_resource).unwrap().len(), 1);

        let page = AuditQuery {
            user_id: Some("target".into()),
            limit: Some(2),
            offset: Some(4),
            ..Default::default()
        };
        assert_eq!(repo.query(&page).unwrap().len(), 1);
    }

    #[test]
    fn macro_writes_event() {
        let (_dir, db) = setup();
        crate::audit_log!(&db, AuditEventType::RateUpdated, "admin-1", "rate", "USDT");

        let events = AuditRepository::new(&db).query(&AuditQuery::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].resource_id.as_deref(), Some("USDT"));
    }
}
