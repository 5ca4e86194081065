// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Each repository borrows the [`Database`](super::Database) and exposes the
//! operations for one entity. Multi-record invariants are kept inside a
//! single write transaction.

pub mod kyc;
pub mod ledger;
pub mod orders;
pub mod otp;
pub mod rates;
pub mod reset_tokens;
pub mod users;
pub mod wallets;

pub use kyc::{
    KycCheck, KycCheckKind, KycDetails, KycDocument, KycRepository, KycStatus, KycSubmission,
};
pub use ledger::{LedgerEntry, LedgerReference, LedgerRepository, TransactionType};
pub use orders::{Order, OrderRepository, OrderStatus, OrderType, PaymentCapture, StatusTransition};
pub use otp::{OtpOutcome, OtpPurpose, OtpRecord, OtpRepository};
pub use rates::{AssetRate, RateRepository};
pub use reset_tokens::{PasswordResetToken, ResetOutcome, ResetTokenRepository};
pub use users::{AccountType, User, UserRepository, UserView};
pub use wallets::{PrimaryChange, SavedWallet, SavedWalletRepository, VerificationStatus};
