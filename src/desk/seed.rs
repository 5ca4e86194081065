// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Default admin account and global rates for a fresh desk.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::{DeskError, DeskResult};
use crate::audit_log;
use crate::auth::{AuthSettings, Role};
use crate::storage::{
    AssetRate, AuditEvent, AuditEventType, Database, KycStatus, RateRepository, StorageError,
    User, UserRepository,
};

pub const DEFAULT_ADMIN_MOBILE: &str = "+919999999999";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@bharatbit.com";
const SYSTEM_ACTOR: &str = "system";

/// (asset, buy, sell) as (mantissa, scale) pairs.
const DEFAULT_RATES: [(&str, (i64, u32), (i64, u32)); 3] = [
    ("USDT", (8450, 2), (8350, 2)),
    ("BTC", (6_850_000, 0), (6_800_000, 0)),
    ("ETH", (285_000, 0), (282_000, 0)),
];

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SeedReport {
    pub admin_created: bool,
    pub rates_inserted: Vec<String>,
}

/// Create the default admin when none exists and a password is configured,
/// then insert any missing default global rates. Safe to run repeatedly.
pub async fn seed_defaults(
    db: &Database,
    auth: &AuthSettings,
    admin_password: Option<&str>,
    actor: Option<&str>,
) -> DeskResult<SeedReport> {
    let mut report = SeedReport::default();
    let users = UserRepository::new(db);

    match admin_password {
        Some(password) if !users.any_admin()? => {
            let hash = auth.passwords.hash(password).await?;
            let mut admin = User::new(DEFAULT_ADMIN_MOBILE.into(), DEFAULT_ADMIN_EMAIL.into(), hash);
            admin.role = Role::Admin;
            admin.is_mobile_verified = true;
            admin.is_email_verified = true;
            admin.kyc_status = KycStatus::Approved;
            users.create(&mut admin).map_err(|e| match e {
                StorageError::AlreadyExists { .. } => DeskError::Conflict(
                    "Default admin identity is already registered to another account".into(),
                ),
                other => other.into(),
            })?;
            tracing::info!(user_id = %admin.id, "Default admin created");
            report.admin_created = true;
        }
        None => tracing::debug!("DEFAULT_ADMIN_PASSWORD not set; skipping default admin"),
        Some(_) => {}
    }

    let actor = actor.unwrap_or(SYSTEM_ACTOR);
    let rates = RateRepository::new(db);
    for (asset, (buy, buy_scale), (sell, sell_scale)) in DEFAULT_RATES {
        let rate = AssetRate {
            asset: asset.to_string(),
            buy_rate: Decimal::new(buy, buy_scale),
            sell_rate: Decimal::new(sell, sell_scale),
            user_specific: None,
            updated_at: Utc::now(),
            updated_by: actor.to_string(),
        };
        if rates.insert_global_if_missing(&rate)? {
            report.rates_inserted.push(asset.to_string());
        }
    }

    let event = AuditEvent::new(AuditEventType::DefaultDataSeeded)
        .with_user(actor)
        .with_details(json!({
            "admin_created": report.admin_created,
            "rates_inserted": report.rates_inserted,
        }));
    audit_log!(@write db, event);
    tracing::info!(
        admin_created = report.admin_created,
        rates_inserted = report.rates_inserted.len(),
        "Default data seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::desk::rates::effective_rate;
    use crate::desk::testutil;
    use std::str::FromStr;

    fn settings() -> AuthSettings {
        let dir = tempfile::tempdir().unwrap();
        AuthSettings::from_config(&AppConfig::for_tests(dir.path()))
    }

    #[tokio::test]
    async fn seeds_admin_and_rates_once() {
        let (_dir, db) = testutil::db();
        let auth = settings();

        let first = seed_defaults(&db, &auth, Some("admin-pass"), None).await.unwrap();
        assert!(first.admin_created);
        assert_eq!(first.rates_inserted, vec!["USDT", "BTC", "ETH"]);

        let admin = UserRepository::new(&db)
            .find_by_identifier(DEFAULT_ADMIN_EMAIL)
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());
        assert!(auth.passwords.verify("admin-pass", &admin.password_hash).await);

        let usdt = effective_rate(&db, &admin.id, "USDT").unwrap();
        assert_eq!(usdt.buy_rate, Decimal::from_str("84.50").unwrap());
        assert_eq!(usdt.sell_rate, Decimal::from_str("83.50").unwrap());
        assert_eq!(usdt.updated_by, "system");

        let second = seed_defaults(&db, &auth, Some("admin-pass"), None).await.unwrap();
        assert!(!second.admin_created);
        assert!(second.rates_inserted.is_empty());
    }

    #[tokio::test]
    async fn no_password_means_no_admin() {
        let (_dir, db) = testutil::db();
        let report = seed_defaults(&db, &settings(), None, Some("admin-1")).await.unwrap();
        assert!(!report.admin_created);
        assert_eq!(report.rates_inserted.len(), 3);
        assert!(!UserRepository::new(&db).any_admin().unwrap());
    }

    #[tokio::test]
    async fn existing_rates_are_kept() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let custom = AssetRate {
            asset: "BTC".into(),
            buy_rate: Decimal::from(1),
            sell_rate: Decimal::from(1),
            user_specific: None,
            updated_at: Utc::now(),
            updated_by: admin.id.clone(),
        };
        RateRepository::new(&db).upsert(&custom).unwrap();

        let report = seed_defaults(&db, &settings(), Some("pw"), Some(&admin.id))
            .await
            .unwrap();
        assert!(!report.admin_created);
        assert_eq!(report.rates_inserted, vec!["USDT", "ETH"]);
        assert_eq!(effective_rate(&db, &admin.id, "BTC").unwrap().buy_rate, Decimal::from(1));
    }
}
