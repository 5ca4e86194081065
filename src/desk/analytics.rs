// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin dashboard figures and audit trail queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::DeskResult;
use crate::auth::Role;
use crate::storage::{
    AuditEvent, AuditQuery, AuditRepository, Database, KycRepository, KycStatus, Order,
    OrderRepository, OrderStatus, OrderType, SavedWalletRepository, User, UserRepository,
    VerificationStatus,
};

const DAILY_WINDOW: i64 = 7;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Analytics {
    pub overview: Overview,
    pub volume: Volume,
    pub charts: Charts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Overview {
    pub total_users: usize,
    pub verified_users: usize,
    pub pending_kyc: usize,
    pub total_orders: usize,
    pub completed_orders: usize,
    pub pending_orders: usize,
    pub pending_wallets: usize,
    pub new_users_this_week: usize,
}

/// INR volume over completed orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Volume {
    #[schema(value_type = f64)]
    pub total_buy_volume: Decimal,
    #[schema(value_type = f64)]
    pub total_sell_volume: Decimal,
    #[schema(value_type = f64)]
    pub total_volume: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Charts {
    pub asset_breakdown: Vec<AssetVolume>,
    /// Oldest day first, today last.
    pub daily_orders: Vec<DailyOrders>,
    pub kyc_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssetVolume {
    pub asset: String,
    pub count: usize,
    #[schema(value_type = f64)]
    pub volume: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyOrders {
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    /// Short weekday name.
    pub day: String,
    /// Orders placed that day.
    pub count: usize,
    /// INR volume of that day's orders that have completed.
    #[schema(value_type = f64)]
    pub volume: Decimal,
}

pub fn analytics(db: &Database) -> DeskResult<Analytics> {
    analytics_at(db, Utc::now())
}

fn analytics_at(db: &Database, now: DateTime<Utc>) -> DeskResult<Analytics> {
    let users = UserRepository::new(db).list_all()?;
    let orders = OrderRepository::new(db).list_all()?;
    let open_kyc = KycRepository::new(db).list_open()?.len();
    let pending_wallets = SavedWalletRepository::new(db)
        .list_all()?
        .iter()
        .filter(|w| w.verification_status == VerificationStatus::Pending)
        .count();

    let customers: Vec<&User> = users.iter().filter(|u| u.role == Role::User).collect();
    let week_ago = now - Duration::days(DAILY_WINDOW);
    let completed: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed)
        .collect();

    let overview = Overview {
        total_users: customers.len(),
        verified_users: customers
            .iter()
            .filter(|u| u.kyc_status == KycStatus::Approved)
            .count(),
        pending_kyc: open_kyc,
        total_orders: orders.len(),
        completed_orders: completed.len(),
        pending_orders: orders.iter().filter(|o| !o.status.is_terminal()).count(),
        pending_wallets,
        new_users_this_week: customers.iter().filter(|u| u.created_at >= week_ago).count(),
    };

    let mut volume = Volume::default();
    let mut by_asset: BTreeMap<&str, AssetVolume> = BTreeMap::new();
    for order in &completed {
        // Volumes saturate at Decimal::MAX.
        match order.order_type {
            OrderType::Buy => {
                volume.total_buy_volume = volume.total_buy_volume.saturating_add(order.total_inr)
            }
            OrderType::Sell => {
                volume.total_sell_volume = volume.total_sell_volume.saturating_add(order.total_inr)
            }
        }
        let slot = by_asset.entry(order.asset.as_str()).or_insert_with(|| AssetVolume {
            asset: order.asset.clone(),
            count: 0,
            volume: Decimal::ZERO,
        });
        slot.count += 1;
        slot.volume = slot.volume.saturating_add(order.total_inr);
    }
    volume.total_volume = volume.total_buy_volume.saturating_add(volume.total_sell_volume);

    let mut kyc_status = BTreeMap::new();
    for status in [
        KycStatus::Approved,
        KycStatus::Pending,
        KycStatus::Rejected,
        KycStatus::UnderReview,
    ] {
        let count = users.iter().filter(|u| u.kyc_status == status).count();
        kyc_status.insert(status.as_str().to_string(), count);
    }

    Ok(Analytics {
        overview,
        volume,
        charts: Charts {
            asset_breakdown: by_asset.into_values().collect(),
            daily_orders: daily_orders(&orders, now.date_naive()),
            kyc_status,
        },
    })
}

fn daily_orders(orders: &[Order], today: NaiveDate) -> Vec<DailyOrders> {
    (0..DAILY_WINDOW)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let placed: Vec<&Order> = orders
                .iter()
                .filter(|o| o.created_at.date_naive() == date)
                .collect();
            DailyOrders {
                date: date.format("%Y-%m-%d").to_string(),
                day: date.format("%a").to_string(),
                count: placed.len(),
                volume: placed
                    .iter()
                    .filter(|o| o.status == OrderStatus::Completed)
                    .fold(Decimal::ZERO, |sum, o| sum.saturating_add(o.total_inr)),
            }
        })
        .collect()
}

pub fn audit_events(db: &Database, query: &AuditQuery) -> DeskResult<Vec<AuditEvent>> {
    Ok(AuditRepository::new(db).query(query)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::orders::{admin_update_order, create_order, NewOrder};
    use crate::desk::rates::{upsert_rate, RateUpdate};
    use crate::desk::testutil;
    use crate::desk::wallets::{save, NewWallet};
    use crate::storage::AuditEventType;
    use std::str::FromStr;

    fn place(db: &Database, user: &User, order_type: OrderType, quantity: i64) -> Order {
        let input = NewOrder {
            asset: "USDT".into(),
            order_type,
            quantity: Decimal::from(quantity),
            wallet_address: None,
        };
        create_order(db, user, input).unwrap()
    }

    #[test]
    fn empty_desk_reports_zeroes() {
        let (_dir, db) = testutil::db();
        let report = analytics(&db).unwrap();
        assert_eq!(report.overview, Overview::default());
        assert_eq!(report.volume, Volume::default());
        assert_eq!(report.charts.daily_orders.len(), 7);
        assert_eq!(report.charts.kyc_status.len(), 4);
    }

    #[test]
    fn volumes_count_completed_orders_only() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        testutil::user(&db, "+919800000002", KycStatus::Pending);
        let update = RateUpdate {
            asset: "USDT".into(),
            buy_rate: Decimal::from(85),
            sell_rate: Decimal::from(83),
            user_scope: None,
        };
        upsert_rate(&db, &admin.id, update).unwrap();

        let bought = place(&db, &user, OrderType::Buy, 100);
        let sold = place(&db, &user, OrderType::Sell, 10);
        place(&db, &user, OrderType::Buy, 1);
        for order in [&bought, &sold] {
            admin_update_order(&db, &admin.id, &order.id, OrderStatus::Completed, None).unwrap();
        }
        let wallet = NewWallet {
            asset: "USDT".into(),
            network: "TRC20".into(),
            wallet_address: "TXabc".into(),
            label: "Main".into(),
            proof_image: None,
        };
        save(&db, &user.id, wallet).unwrap();

        let report = analytics(&db).unwrap();
        assert_eq!(report.overview.total_users, 2);
        assert_eq!(report.overview.verified_users, 1);
        assert_eq!(report.overview.total_orders, 3);
        assert_eq!(report.overview.completed_orders, 2);
        assert_eq!(report.overview.pending_orders, 1);
        assert_eq!(report.overview.pending_wallets, 1);
        assert_eq!(report.overview.new_users_this_week, 2);

        assert_eq!(report.volume.total_buy_volume, Decimal::from(8500));
        assert_eq!(report.volume.total_sell_volume, Decimal::from(830));
        assert_eq!(report.volume.total_volume, Decimal::from(9330));

        let usdt = &report.charts.asset_breakdown[0];
        assert_eq!((usdt.asset.as_str(), usdt.count), ("USDT", 2));

        let today = report.charts.daily_orders.last().unwrap();
        assert_eq!(today.count, 3);
        assert_eq!(today.volume, Decimal::from(9330));
        // The admin is counted in the KYC breakdown but not as a customer.
        assert_eq!(report.charts.kyc_status["approved"], 1);
        assert_eq!(report.charts.kyc_status["pending"], 2);
    }

    #[test]
    fn huge_volumes_saturate() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let user = testutil::user(&db, "+919800000001", KycStatus::Approved);
        let update = RateUpdate {
            asset: "USDT".into(),
            buy_rate: Decimal::from(1),
            sell_rate: Decimal::from(1),
            user_scope: None,
        };
        upsert_rate(&db, &admin.id, update).unwrap();

        for order_type in [OrderType::Buy, OrderType::Buy, OrderType::Sell] {
            let input = NewOrder {
                asset: "USDT".into(),
                order_type,
                quantity: Decimal::from_str("50000000000000000000000000000").unwrap(),
                wallet_address: None,
            };
            let order = create_order(&db, &user, input).unwrap();
            admin_update_order(&db, &admin.id, &order.id, OrderStatus::Completed, None).unwrap();
        }

        let report = analytics(&db).unwrap();
        assert_eq!(report.volume.total_buy_volume, Decimal::MAX);
        assert_eq!(report.volume.total_volume, Decimal::MAX);
        assert_eq!(report.charts.asset_breakdown[0].volume, Decimal::MAX);
        assert_eq!(report.charts.daily_orders.last().unwrap().volume, Decimal::MAX);
    }

    #[test]
    fn daily_window_ends_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let days = daily_orders(&[], today);
        assert_eq!(days.first().unwrap().date, "2026-03-04");
        assert_eq!(days.last().unwrap().date, "2026-03-10");
        assert_eq!(days.last().unwrap().day, "Tue");
    }

    #[test]
    fn audit_query_filters_by_type() {
        let (_dir, db) = testutil::db();
        let admin = testutil::admin(&db);
        let update = RateUpdate {
            asset: "BTC".into(),
            buy_rate: Decimal::from(1),
            sell_rate: Decimal::from(1),
            user_scope: None,
        };
        upsert_rate(&db, &admin.id, update).unwrap();

        let query = AuditQuery {
            event_type: Some(AuditEventType::RateUpdated),
            ..Default::default()
        };
        let events = audit_events(&db, &query).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id.as_deref(), Some(admin.id.as_str()));
    }
}
