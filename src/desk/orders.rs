// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Order placement, customer updates and the admin status machine.
//!
//! The rate is snapshotted onto the order when it is placed. Completing an
//! order settles it into the ledger exactly once; see
//! [`OrderRepository::transition`].

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::rates::effective_rate;
use super::{normalize_asset, DeskError, DeskResult};
use crate::audit_log;
use crate::auth::AuthenticatedUser;
use crate::providers::{PaymentInstructions, PaymentProvider};
use crate::storage::{
    AuditEvent, AuditEventType, Database, KycStatus, LedgerEntry, LedgerReference, Order,
    OrderRepository, OrderStatus, OrderType, OwnershipCheck, PaymentCapture, StatusTransition, TransactionType,
    User, UserRepository,
};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub asset: String,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub wallet_address: Option<String>,
}

/// Fields a customer may attach to their own order.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub payment_proof: Option<String>,
    pub tx_reference: Option<String>,
}

/// Result of an admin status change that was accepted.
#[derive(Debug)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
    pub ledger_entry: Option<LedgerEntry>,
}

impl StatusChange {
    pub fn changed(&self) -> bool {
        self.previous != self.order.status
    }
}

/// An order with its owner's contact details, for the admin list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub user_email: Option<String>,
    pub user_mobile: Option<String>,
}

pub fn create_order(db: &Database, user: &User, input: NewOrder) -> DeskResult<Order> {
    if user.kyc_status != KycStatus::Approved {
        return Err(DeskError::KycNotApproved);
    }
    let asset = normalize_asset(&input.asset)?;
    if input.quantity <= Decimal::ZERO {
        return Err(DeskError::Validation("Quantity must be positive".into()));
    }

    let rate_row = effective_rate(db, &user.id, &asset)?;
    let rate = match input.order_type {
        OrderType::Buy => rate_row.buy_rate,
        OrderType::Sell => rate_row.sell_rate,
    };

    let total_inr = input
        .quantity
        .checked_mul(rate)
        .ok_or_else(|| DeskError::Validation("Quantity too large".into()))?;

    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        asset,
        order_type: input.order_type,
        quantity: input.quantity,
        rate,
        total_inr,
        status: OrderStatus::AwaitingPayment,
        payment_proof: None,
        tx_reference: None,
        gateway_payment_id: None,
        wallet_address: input
            .wallet_address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()),
        notes: None,
        created_at: Utc::now(),
        updated_at: None,
    };
    OrderRepository::new(db).create(&order)?;

    audit_log!(db, AuditEventType::OrderCreated, &user.id, "order", &order.id);
    tracing::info!(
        order_id = %order.id,
        user_id = %user.id,
        asset = %order.asset,
        total_inr = %order.total_inr,
        "Order created"
    );
    Ok(order)
}

/// Attach payment proof or a transaction reference. Never moves the status.
pub fn update_order(
    db: &Database,
    user: &AuthenticatedUser,
    order_id: &str,
    update: OrderUpdate,
) -> DeskResult<Order> {
    let payment_proof = update.payment_proof.filter(|p| !p.trim().is_empty());
    let tx_reference = update.tx_reference.filter(|r| !r.trim().is_empty());
    if payment_proof.is_none() && tx_reference.is_none() {
        return Err(DeskError::Validation(
            "Provide payment_proof or tx_reference".into(),
        ));
    }

    let repo = OrderRepository::new(db);
    let order = repo.find(order_id)?.verify_owner(user, order_id)?;
    if order.status.is_terminal() {
        return Err(DeskError::TerminalOrder(order.status));
    }

    let updated = repo.update(order_id, |o| {
        if payment_proof.is_some() {
            o.payment_proof = payment_proof;
        }
        if tx_reference.is_some() {
            o.tx_reference = tx_reference;
        }
        o.updated_at = Some(Utc::now());
    })?;
    tracing::info!(order_id = %order_id, user_id = %user.user_id, "Order payment details attached");
    Ok(updated)
}

/// Move an order to `next`. Completion settles into the ledger once.
pub fn admin_update_order(
    db: &Database,
    admin_id: &str,
    order_id: &str,
    next: OrderStatus,
    notes: Option<String>,
) -> DeskResult<StatusChange> {
    let notes = notes.filter(|n| !n.trim().is_empty());
    let transition = OrderRepository::new(db).transition(order_id, next, notes, |order| {
        settlement_entry(order, admin_id)
    })?;

    let (order, previous, ledger_entry) = match transition {
        StatusTransition::Rejected { current } => return Err(DeskError::TerminalOrder(current)),
        StatusTransition::Applied {
            order,
            previous,
            ledger_entry,
        } => (order, previous, ledger_entry),
    };

    let event = AuditEvent::new(AuditEventType::OrderStatusChanged)
        .with_user(admin_id)
        .with_resource("order", &order.id)
        .with_details(json!({ "from": previous, "to": order.status }));
    audit_log!(@write db, event);

    if let Some(entry) = &ledger_entry {
        let event = AuditEvent::new(AuditEventType::LedgerEntryCreated)
            .with_user(admin_id)
            .with_resource("ledger_entry", &entry.id)
            .with_details(json!({
                "order_id": order.id,
                "transaction_type": entry.transaction_type,
                "amount": entry.amount,
                "asset": entry.asset,
            }));
        audit_log!(@write db, event);
        tracing::info!(order_id = %order.id, entry_id = %entry.id, "Order settled to ledger");
    }

    tracing::info!(
        order_id = %order.id,
        from = %previous,
        to = %order.status,
        admin_id = %admin_id,
        "Order status updated"
    );
    Ok(StatusChange {
        order,
        previous,
        ledger_entry,
    })
}

fn settlement_entry(order: &Order, admin_id: &str) -> Option<LedgerEntry> {
    if order.status != OrderStatus::Completed {
        return None;
    }
    let (transaction_type, verb) = match order.order_type {
        OrderType::Buy => (TransactionType::Credit, "Buy"),
        OrderType::Sell => (TransactionType::Debit, "Sell"),
    };
    Some(LedgerEntry {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: order.user_id.clone(),
        asset: order.asset.clone(),
        transaction_type,
        amount: order.quantity,
        description: format!("{verb} order #{} completed", order.short_id()),
        reference: LedgerReference::Order,
        order_id: Some(order.id.clone()),
        created_by: Some(admin_id.to_string()),
        created_at: Utc::now(),
    })
}

/// Record a captured gateway payment. The status is left for an admin.
///
/// Completed and cancelled orders are not modified.
pub fn record_gateway_payment(db: &Database, order_id: &str, payment_id: &str) -> DeskResult<Order> {
    let order = match OrderRepository::new(db).record_gateway_payment(order_id, payment_id)? {
        PaymentCapture::Recorded(order) => order,
        PaymentCapture::Closed { current } => return Err(DeskError::TerminalOrder(current)),
    };

    let event = AuditEvent::new(AuditEventType::PaymentCaptured)
        .with_resource("order", order_id)
        .with_details(json!({ "payment_id": payment_id }));
    audit_log!(@write db, event);
    tracing::info!(order_id = %order_id, payment_id = %payment_id, "Gateway payment recorded");
    Ok(order)
}

/// The order if `user` owns it or is an admin.
pub fn get_order(db: &Database, user: &AuthenticatedUser, order_id: &str) -> DeskResult<Order> {
    let repo = OrderRepository::new(db);
    if user.is_admin() {
        return Ok(repo.get(order_id)?);
    }
    Ok(repo.find(order_id)?.verify_owner(user, order_id)?)
}

/// Payment instructions for an owned order still awaiting payment.
pub async fn payment_request(
    db: &Database,
    payments: &PaymentProvider,
    user: &AuthenticatedUser,
    order_id: &str,
) -> DeskResult<PaymentInstructions> {
    let order = OrderRepository::new(db).find(order_id)?.verify_owner(user, order_id)?;
    if order.status != OrderStatus::AwaitingPayment {
        return Err(DeskError::Conflict(format!(
            "Order is {}, payment is no longer expected",
            order.status
        )));
    }
    let description = format!("{} {} order #{}", order.quantity, order.asset, order.short_id());
    Ok(payments
        .payment_request(&order.id, order.total_inr, &description)
        .await?)
}

pub fn list_by_user(db: &Database, user_id: &str) -> DeskResult<Vec<Order>> {
    Ok(OrderRepository::new(db).list_by_user(user_id)?)
}

/// Every order, newest first, with owner contact details.
pub fn list_all(db: &Database) -> DeskResult<Vec<AdminOrderView>> {
    let owners: HashMap<String, User> = UserRepository::new(db)
        .list_all()?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    Ok(OrderRepository::new(db)
        .list_all()?
        .into_iter()
        .map(|order| {
            let owner = owners.get(&order.user_id);
            AdminOrderView {
                user_email: owner.map(|u| u.email.clone()),
                user_mobile: owner.map(|u| u.mobile.clone()),
                order,
            }
        })
        .collect())
}
