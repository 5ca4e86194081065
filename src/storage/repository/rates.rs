// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Buy/sell rates per asset, optionally scoped to a single user.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{Database, ASSET_RATES};
use crate::storage::StorageResult;

/// Key segment used for rows that apply to every user.
const GLOBAL_SCOPE: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetRate {
    pub asset: String,
    #[schema(value_type = f64)]
    pub buy_rate: Decimal,
    #[schema(value_type = f64)]
    pub sell_rate: Decimal,
    /// User the rate is reserved for; `None` for the global rate.
    pub user_specific: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

fn rate_key(asset: &str, user_scope: Option<&str>) -> String {
    format!("{asset}|{}", user_scope.unwrap_or(GLOBAL_SCOPE))
}

pub struct RateRepository<'a> {
    db: &'a Database,
}

impl<'a> RateRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The row for exactly `(asset, user_scope)`.
    pub fn find(&self, asset: &str, user_scope: Option<&str>) -> StorageResult<Option<AssetRate>> {
        self.db.get(ASSET_RATES, &rate_key(asset, user_scope))
    }

    /// Replace the row matching `(asset, user_specific)`.
    pub fn upsert(&self, rate: &AssetRate) -> StorageResult<()> {
        self.db.put(
            ASSET_RATES,
            &rate_key(&rate.asset, rate.user_specific.as_deref()),
            rate,
        )
    }

    /// Insert the global row only if none exists. Returns whether it was written.
    pub fn insert_global_if_missing(&self, rate: &AssetRate) -> StorageResult<bool> {
        let key = rate_key(&rate.asset, None);
        self.db.write(|txn| {
            if txn.contains(ASSET_RATES, &key)? {
                return Ok(false);
            }
            txn.put(ASSET_RATES, &key, rate)?;
            Ok(true)
        })
    }

    /// Every row, global and user-specific, ordered by asset.
    pub fn list_all(&self) -> StorageResult<Vec<AssetRate>> {
        self.db.scan(ASSET_RATES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(asset: &str, buy: i64, scope: Option<&str>) -> AssetRate {
        AssetRate {
            asset: asset.into(),
            buy_rate: Decimal::from(buy),
            sell_rate: Decimal::from(buy - 1),
            user_specific: scope.map(str::to_string),
            updated_at: Utc::now(),
            updated_by: "admin".into(),
        }
    }

    #[test]
    fn global_and_user_rows_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        let repo = RateRepository::new(&db);

        repo.upsert(&rate("USDT", 84, None)).unwrap();
        repo.upsert(&rate("USDT", 80, Some("vip"))).unwrap();
        repo.upsert(&rate("USDT", 85, None)).unwrap();

        assert_eq!(repo.find("USDT", None).unwrap().unwrap().buy_rate, Decimal::from(85));
        assert_eq!(repo.find("USDT", Some("vip")).unwrap().unwrap().buy_rate, Decimal::from(80));
        assert!(repo.find("USDT", Some("other")).unwrap().is_none());
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn insert_global_if_missing_keeps_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_dir(dir.path()).unwrap();
        let repo = RateRepository::new(&db);

        assert!(repo.insert_global_if_missing(&rate("BTC", 10, None)).unwrap());
        assert!(!repo.insert_global_if_missing(&rate("BTC", 99, None)).unwrap());
        assert_eq!(repo.find("BTC", None).unwrap().unwrap().buy_rate, Decimal::from(10));
    }
}
