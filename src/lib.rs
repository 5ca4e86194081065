// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OTC Desk Server - backend for a crypto over-the-counter trading desk
//!
//! Customers register with OTP verification, sign in with a second factor,
//! pass KYC review and then place buy or sell orders at desk rates. Admins
//! settle orders into an append-only ledger, manage rates and review saved
//! withdrawal wallets.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT sessions, password hashing, OTP codes
//! - `desk` - Business rules, independent of HTTP
//! - `notify` - Email, SMS and push delivery through a background queue
//! - `prices` - Cached CoinGecko price feed
//! - `providers` - Payment gateway, KYC verification and shared provider plumbing
//! - `storage` - redb persistence and the audit trail

pub mod api;
pub mod auth;
pub mod config;
pub mod desk;
pub mod error;
pub mod notify;
pub mod prices;
pub mod providers;
pub mod state;
pub mod storage;
