// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb file under `DATA_DIR`. Records are
//! JSON-encoded and grouped into one table per entity; see [`database`] for
//! the table layout.
//!
//! ## Consistency Model
//!
//! - redb admits one write transaction at a time
//! - every multi-record invariant (ledger settlement, primary wallet, OTP
//!   consumption, identity uniqueness) is checked and written inside one
//!   [`Database::write`] call
//! - readers see the last committed snapshot

pub mod audit;
pub mod database;
pub mod ownership;
pub mod repository;

pub use audit::{AuditEvent, AuditEventType, AuditQuery, AuditRepository};
pub use database::{Database, StorageError, StorageResult};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipEnforcer};
pub use repository::{
    AccountType, AssetRate, KycCheck, KycCheckKind, KycDetails, KycDocument, KycRepository, KycStatus, KycSubmission,
    LedgerEntry, LedgerReference, LedgerRepository, Order, OrderRepository, OrderStatus,
    OrderType, OtpOutcome, OtpPurpose, OtpRecord, OtpRepository, PasswordResetToken, PaymentCapture,
    PrimaryChange, RateRepository, ResetOutcome, ResetTokenRepository, SavedWallet,
    SavedWalletRepository, StatusTransition, TransactionType, User, UserRepository, UserView,
    VerificationStatus,
};
