// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Effective rates and admin rate management.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use super::{normalize_asset, DeskError, DeskResult};
use crate::audit_log;
use crate::storage::{AssetRate, AuditEvent, AuditEventType, Database, RateRepository, UserRepository};

/// Input to [`upsert_rate`].
#[derive(Debug, Clone)]
pub struct RateUpdate {
    pub asset: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub user_scope: Option<String>,
}

/// The user's own row for `asset` if one exists, else the global row.
pub fn effective_rate(db: &Database, user_id: &str, asset: &str) -> DeskResult<AssetRate> {
    let asset = normalize_asset(asset)?;
    let rates = RateRepository::new(db);
    if let Some(rate) = rates.find(&asset, Some(user_id))? {
        return Ok(rate);
    }
    rates.find(&asset, None)?.ok_or(DeskError::RateNotFound(asset))
}

/// One row per asset as seen by `user_id`.
pub fn rates_for(db: &Database, user_id: &str) -> DeskResult<Vec<AssetRate>> {
    let mut by_asset: BTreeMap<String, AssetRate> = BTreeMap::new();
    for rate in RateRepository::new(db).list_all()? {
        match rate.user_specific.as_deref() {
            None => {
                by_asset.entry(rate.asset.clone()).or_insert(rate);
            }
            Some(scope) if scope == user_id => {
                by_asset.insert(rate.asset.clone(), rate);
            }
            Some(_) => {}
        }
    }
    Ok(by_asset.into_values().collect())
}

pub fn list_all_rates(db: &Database) -> DeskResult<Vec<AssetRate>> {
    Ok(RateRepository::new(db).list_all()?)
}

/// Replace the row for `(asset, user_scope)`. Last write wins.
pub fn upsert_rate(db: &Database, admin_id: &str, update: RateUpdate) -> DeskResult<AssetRate> {
    let asset = normalize_asset(&update.asset)?;
    if update.buy_rate <= Decimal::ZERO || update.sell_rate <= Decimal::ZERO {
        return Err(DeskError::Validation("Rates must be positive".into()));
    }
    let user_scope = update.user_scope.filter(|s| !s.trim().is_empty());
    if let Some(user_id) = user_scope.as_deref() {
        UserRepository::new(db).get(user_id)?;
    }

    let rate = AssetRate {
        asset,
        buy_rate: update.buy_rate,
        sell_rate: update.sell_rate,
        user_specific: user_scope,
        updated_at: Utc::now(),
        updated_by: admin_id.to_string(),
    };
    RateRepository::new(db).upsert(&rate)?;

    let event = AuditEvent::new(AuditEventType::RateUpdated)
        .with_user(admin_id)
        .with_resource("asset_rate", &rate.asset)
        .with_details(json!({
            "buy_rate": rate.buy_rate,
            "sell_rate": rate.sell_rate,
            "user_specific": rate.user_specific,
        }));
    audit_log!(@write db, event);
    tracing::info!(asset = %rate.asset, admin_id = %admin_id, "Rate updated");
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::testutil;
    use crate::storage::KycStatus;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn update(asset: &str, buy: &str, sell: &str, scope: Option<&str>) -> RateUpdate {
        RateUpdate {
            asset: asset.into(),
            buy_rate: dec(buy),
            sell_rate: dec(sell),
            user_scope: scope.map(str::to_string),
        }
    }

    #[test]
    fn user_specific_rate_takes_priority() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let vip = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let regular = testutil::user(&db, "+919800000002", KycStatus::Approved);

        upsert_rate(&db, &admin.id, update("usdt", "84.50", "83.50", None)).unwrap();
        upsert_rate(&db, &admin.id, update("USDT", "84.10", "83.90", Some(&vip.id))).unwrap();

        assert_eq!(effective_rate(&db, &vip.id, "USDT").unwrap().buy_rate, dec("84.10"));
        assert_eq!(effective_rate(&db, &regular.id, "usdt").unwrap().buy_rate, dec("84.50"));
    }

    #[test]
    fn missing_rate_is_reported_per_asset() {
        let (_dir, db) = testutil::db();
        let err = effective_rate(&db, "u1", "DOGE").unwrap_err();
        assert!(matches!(err, DeskError::RateNotFound(ref a) if a == "DOGE"));
    }

    #[test]
    fn upsert_replaces_and_validates() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);

        upsert_rate(&db, &admin.id, update("BTC", "6850000", "6800000", None)).unwrap();
        upsert_rate(&db, &admin.id, update("BTC", "6900000", "6850000", None)).unwrap();
        assert_eq!(list_all_rates(&db).unwrap().len(), 1);
        assert_eq!(effective_rate(&db, "u1", "BTC").unwrap().buy_rate, dec("6900000"));

        assert!(matches!(
            upsert_rate(&db, &admin.id, update("BTC", "0", "1", None)),
            Err(DeskError::Validation(_))
        ));
        assert!(matches!(
            upsert_rate(&db, &admin.id, update("BTC", "1", "1", Some("ghost"))),
            Err(DeskError::NotFound(_))
        ));
    }

    #[test]
    fn rates_for_user_merges_overrides() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let vip = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let other = testutil::user(&db, "+919800000002", KycStatus::Approved);

        upsert_rate(&db, &admin.id, update("USDT", "84.50", "83.50", None)).unwrap();
        upsert_rate(&db, &admin.id, update("ETH", "285000", "282000", None)).unwrap();
        upsert_rate(&db, &admin.id, update("USDT", "84.00", "83.00", Some(&vip.id))).unwrap();
        upsert_rate(&db, &admin.id, update("ETH", "1", "1", Some(&other.id))).unwrap();

        let rates = rates_for(&db, &vip.id).unwrap();
        assert_eq!(rates.len(), 2);
        let usdt = rates.iter().find(|r| r.asset == "USDT").unwrap();
        assert_eq!(usdt.user_specific.as_deref(), Some(vip.id.as_str()));
        let eth = rates.iter().find(|r| r.asset == "ETH").unwrap();
        assert!(eth.user_specific.is_none());
    }
}
