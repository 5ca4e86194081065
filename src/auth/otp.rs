// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time codes and reset tokens from the system CSPRNG.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};

use super::AuthError;
use crate::storage::{OtpPurpose, OtpRecord};

/// OTP validity window.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Random bytes in a password reset token.
const RESET_TOKEN_BYTES: usize = 32;

/// Generates OTP records and reset tokens.
#[derive(Clone)]
pub struct OtpIssuer {
    rng: SystemRandom,
    /// Code used instead of a random one (development and mock deployments).
    fixed_code: Option<String>,
    ttl: Duration,
}

impl OtpIssuer {
    pub fn new(fixed_code: Option<String>) -> Self {
        Self {
            rng: SystemRandom::new(),
            fixed_code,
            ttl: Duration::minutes(OTP_TTL_MINUTES),
        }
    }

    /// A uniformly random 6-digit code, or the fixed code when configured.
    pub fn generate_code(&self) -> Result<String, AuthError> {
        if let Some(code) = &self.fixed_code {
            return Ok(code.clone());
        }
        // Rejection sampling keeps the distribution uniform
        const LIMIT: u32 = u32::MAX - (u32::MAX % 1_000_000);
        loop {
            let mut buf = [0u8; 4];
            self.rng
                .fill(&mut buf)
                .map_err(|_| AuthError::InternalError("system RNG unavailable".to_string()))?;
            let n = u32::from_le_bytes(buf);
            if n < LIMIT {
                return Ok(format!("{:06}", n % 1_000_000));
            }
        }
    }

    /// Fresh unused record for `identifier`, expiring after the OTP window.
    pub fn new_record(&self, identifier: &str, purpose: OtpPurpose) -> Result<OtpRecord, AuthError> {
        let now = Utc::now();
        Ok(OtpRecord {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            code: self.generate_code()?,
            purpose,
            created_at: now,
            expires_at: now + self.ttl,
            is_used: false,
        })
    }

    /// URL-safe random token for password reset links.
    pub fn reset_token(&self) -> Result<String, AuthError> {
        let mut buf = [0u8; RESET_TOKEN_BYTES];
        self.rng
            .fill(&mut buf)
            .map_err(|_| AuthError::InternalError("system RNG unavailable".to_string()))?;
        Ok(Base64UrlUnpadded::encode_string(&buf))
    }
}
