// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::config::AppConfig;
use crate::notify::NotificationDispatcher;
use crate::prices::PriceService;
use crate::providers::{KycVerifier, PaymentProvider};
use crate::storage::Database;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthSettings>,
    pub notifier: NotificationDispatcher,
    pub prices: Arc<PriceService>,
    pub payments: Arc<PaymentProvider>,
    pub kyc: Arc<KycVerifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: AppConfig,
        notifier: NotificationDispatcher,
        prices: PriceService,
        payments: PaymentProvider,
        kyc: KycVerifier,
    ) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(AuthSettings::from_config(&config)),
            notifier,
            prices: Arc::new(prices),
            payments: Arc::new(payments),
            kyc: Arc::new(kyc),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use super::*;
    use crate::auth::Role;
    use crate::notify::Notification;
    use crate::prices::CoinGeckoClient;
    use crate::storage::{KycStatus, User, UserRepository};

    /// Password used for every harness-created account.
    pub const TEST_PASSWORD: &str = "correct-horse";

    /// An `AppState` over a temporary database with mocked providers.
    ///
    /// Queued notifications stay in `outbox` for inspection.
    pub struct TestHarness {
        pub state: AppState,
        pub outbox: mpsc::Receiver<Notification>,
        _dir: TempDir,
    }

    impl TestHarness {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = AppConfig::for_tests(dir.path());
            let db = Database::open_in_dir(dir.path()).unwrap();
            let (notifier, outbox) = NotificationDispatcher::channel(256);
            // Nothing listens on the discard port; price calls fail fast.
            let prices = PriceService::new(
                CoinGeckoClient::new("http://127.0.0.1:9").unwrap(),
                Duration::from_secs(60),
            );
            let payments = PaymentProvider::Mock {
                upi: config.upi.clone(),
            };
            Self {
                state: AppState::new(db, config, notifier, prices, payments, KycVerifier::Mock),
                outbox,
                _dir: dir,
            }
        }

        pub fn db(&self) -> &Database {
            &self.state.db
        }

        /// Store a verified account with `TEST_PASSWORD`.
        pub async fn create_user(&self, mobile: &str, email: &str, role: Role, kyc: KycStatus) -> User {
            let hash = self.state.auth.passwords.hash(TEST_PASSWORD).await.unwrap();
            let mut user = User::new(mobile.into(), email.into(), hash);
            user.role = role;
            user.kyc_status = kyc;
            user.is_mobile_verified = true;
            user.is_email_verified = true;
            UserRepository::new(self.db()).create(&mut user).unwrap();
            user
        }

        pub async fn admin(&self) -> User {
            self.create_user("+919999999999", "admin@example.com", Role::Admin, KycStatus::Approved)
                .await
        }

        pub async fn customer(&self) -> User {
            self.create_user("+919800000001", "user@example.com", Role::User, KycStatus::Approved)
                .await
        }

        pub fn token_for(&self, user: &User) -> String {
            self.state.auth.tokens.issue(&user.id).unwrap()
        }

        /// Everything queued so far.
        pub fn drain_outbox(&mut self) -> Vec<Notification> {
            let mut sent = Vec::new();
            while let Ok(n) = self.outbox.try_recv() {
                sent.push(n);
            }
            sent
        }
    }
}
