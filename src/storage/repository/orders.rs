// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Buy/sell orders and their status transitions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ledger::{insert_order_entry, LedgerEntry};
use crate::storage::database::{Database, ORDERS};
use crate::storage::{OwnedResource, StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Buy,
    Sell,
}

/// Order lifecycle.
///
/// `awaiting_payment → payment_confirmed → processing → completed`, or
/// `cancelled` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    PaymentConfirmed,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// Non-terminal orders may move anywhere. Terminal orders only accept
    /// their own status, which leaves them unchanged.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        !self.is_terminal() || *self == next
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::PaymentConfirmed => "payment_confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub asset: String,
    pub order_type: OrderType,
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    /// Rate snapshot taken when the order was placed.
    #[schema(value_type = f64)]
    pub rate: Decimal,
    #[schema(value_type = f64)]
    pub total_inr: Decimal,
    pub status: OrderStatus,
    pub payment_proof: Option<String>,
    pub tx_reference: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub wallet_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Short reference shown to customers.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

impl OwnedResource for Order {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }
}

/// Outcome of an admin status change.
#[derive(Debug)]
pub enum StatusTransition {
    Applied {
        order: Order,
        previous: OrderStatus,
        /// Set only when this call created the order's ledger entry.
        ledger_entry: Option<LedgerEntry>,
    },
    /// The order is terminal and cannot move to the requested status.
    Rejected { current: OrderStatus },
}

/// Outcome of attaching a gateway payment id to an order.
#[derive(Debug)]
pub enum PaymentCapture {
    Recorded(Order),
    /// Completed and cancelled orders are left untouched.
    Closed { current: OrderStatus },
}

pub struct OrderRepository<'a> {
    db: &'a Database,
}

impl<'a> OrderRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn get(&self, order_id: &str) -> StorageResult<Order> {
        self.db
            .get(ORDERS, order_id)?
            .ok_or_else(|| StorageError::not_found("order", order_id))
    }

    pub fn find(&self, order_id: &str) -> StorageResult<Option<Order>> {
        self.db.get(ORDERS, order_id)
    }

    pub fn create(&self, order: &Order) -> StorageResult<()> {
        self.db
            .write(|txn| txn.insert_new(ORDERS, "order", &order.id, order))
    }

    pub fn update(&self, order_id: &str, f: impl FnOnce(&mut Order)) -> StorageResult<Order> {
        self.db.write(|txn| txn.update(ORDERS, "order", order_id, f))
    }

    /// Store the gateway payment id unless the order is already closed.
    pub fn record_gateway_payment(&self, order_id: &str, payment_id: &str) -> StorageResult<PaymentCapture> {
        self.db.write(|txn| {
            let mut order: Order = txn
                .get(ORDERS, order_id)?
                .ok_or_else(|| StorageError::not_found("order", order_id))?;
            if order.status.is_terminal() {
                return Ok(PaymentCapture::Closed {
                    current: order.status,
                });
            }
            order.gateway_payment_id = Some(payment_id.to_string());
            order.updated_at = Some(Utc::now());
            txn.put(ORDERS, order_id, &order)?;
            Ok(PaymentCapture::Recorded(order))
        })
    }

    /// Move an order to `next` in a single write transaction.
    ///
    /// `settle` is called with the updated order and may return the ledger
    /// entry that settles it. The entry is inserted only if the order has
    /// none yet, so repeated or concurrent completions settle exactly once.
    pub fn transition(
        &self,
        order_id: &str,
        next: OrderStatus,
        notes: Option<String>,
        settle: impl FnOnce(&Order) -> Option<LedgerEntry>,
    ) -> StorageResult<StatusTransition> {
        self.db.write(|txn| {
            let mut order: Order = txn
                .get(ORDERS, order_id)?
                .ok_or_else(|| StorageError::not_found("order", order_id))?;

            let previous = order.status;
            if !previous.can_transition_to(next) {
                return Ok(StatusTransition::Rejected { current: previous });
            }
            // Re-applying a terminal status is a no-op.
            if previous.is_terminal() {
                return Ok(StatusTransition::Applied {
                    order,
                    previous,
                    ledger_entry: None,
                });
            }

            order.status = next;
            if notes.is_some() {
                order.notes = notes;
            }
            order.updated_at = Some(Utc::now());
            txn.put(ORDERS, order_id, &order)?;

            let ledger_entry = match settle(&order) {
                Some(entry) if insert_order_entry(txn, &entry)? => Some(entry),
                _ => None,
            };

            Ok(StatusTransition::Applied {
                order,
                previous,
                ledger_entry,
            })
        })
    }

    /// Orders of one user, newest first.
    pub fn list_by_user(&self, user_id: &str) -> StorageResult<Vec<Order>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect())
    }

    /// All orders, newest first.
    pub fn list_all(&self) -> StorageResult<Vec<Order>> {
        let mut orders: Vec<Order> = self.db.scan(ORDERS)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
