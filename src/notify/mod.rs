// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fire-and-forget notifications over email, SMS and push.
//!
//! Request handlers enqueue a [`Notification`] through the
//! [`NotificationDispatcher`] and return immediately. A single
//! [`NotificationWorker`] drains the queue in the background and hands each
//! message to the configured provider. Delivery failures are logged and never
//! reach the caller.
//!
//! Providers are selected from the environment:
//!
//! | Variable | Values |
//! |----------|--------|
//! | `EMAIL_PROVIDER` | `mock` (default), `sendgrid`, `resend` |
//! | `SMS_PROVIDER` | `mock` (default), `twilio`, `msg91` |
//! | `PUSH_NOTIFICATIONS_ENABLED` | `true` (default) / `false` |

pub mod email;
pub mod push;
pub mod sms;
pub mod templates;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use email::EmailBackend;
pub use push::PushClient;
pub use sms::SmsBackend;
pub use templates::{RenderedMessage, Template};

use crate::providers::ProviderError;

/// Queue depth before new notifications are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
    Push,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub channel: Channel,
    /// Email address, mobile number or push token.
    pub target: String,
    pub template: Template,
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub success: bool,
    pub provider: &'static str,
    /// Provider message id on success, error text otherwise.
    pub detail: String,
}

impl DeliveryReport {
    pub fn delivered(provider: &'static str, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            provider,
            detail: detail.into(),
        }
    }

    pub fn failed(provider: &'static str, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            provider,
            detail: detail.into(),
        }
    }

    pub fn from_result(provider: &'static str, result: Result<String, ProviderError>) -> Self {
        match result {
            Ok(detail) => Self::delivered(provider, detail),
            Err(e) => Self::failed(provider, e.to_string()),
        }
    }
}

/// The configured backend for each channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    pub email: EmailBackend,
    pub sms: SmsBackend,
    pub push: PushClient,
}

impl Notifier {
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self {
            email: EmailBackend::from_env()?,
            sms: SmsBackend::from_env()?,
            push: PushClient::from_env()?,
        })
    }

    /// All channels mocked.
    #[cfg(test)]
    pub fn mock() -> Result<Self, ProviderError> {
        Ok(Self {
            email: EmailBackend::Mock,
            sms: SmsBackend::Mock,
            push: PushClient::disabled()?,
        })
    }

    pub async fn deliver(&self, notification: &Notification) -> DeliveryReport {
        let message = notification.template.render();
        match notification.channel {
            Channel::Email => {
                self.email
                    .send(&notification.target, &message.subject, &message.html)
                    .await
            }
            Channel::Sms => self.sms.send(&notification.target, &message.text).await,
            Channel::Push => {
                self.push
                    .send(
                        &notification.target,
                        &message.subject,
                        &message.text,
                        &message.data,
                    )
                    .await
            }
        }
    }
}

/// Cloneable handle used by request handlers to enqueue notifications.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Create a dispatcher and the receiving end for a [`NotificationWorker`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. A full or closed queue drops the message.
    pub fn notify(&self, notification: Notification) {
        let kind = notification.template.kind();
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(template = kind, "Notification queue full; dropping message");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(template = kind, "Notification worker stopped; dropping message");
            }
        }
    }

    pub fn email(&self, to: impl Into<String>, template: Template) {
        self.notify(Notification {
            channel: Channel::Email,
            target: to.into(),
            template,
        });
    }

    pub fn sms(&self, mobile: impl Into<String>, template: Template) {
        self.notify(Notification {
            channel: Channel::Sms,
            target: mobile.into(),
            template,
        });
    }

    /// Push to a device; users without a registered token are skipped.
    pub fn push(&self, token: Option<&str>, template: Template) {
        if let Some(token) = token {
            self.notify(Notification {
                channel: Channel::Push,
                target: token.to_string(),
                template,
            });
        }
    }
}

/// Background consumer of the notification queue.
pub struct NotificationWorker {
    rx: mpsc::Receiver<Notification>,
    notifier: Arc<Notifier>,
}

impl NotificationWorker {
    pub fn new(rx: mpsc::Receiver<Notification>, notifier: Arc<Notifier>) -> Self {
        Self { rx, notifier }
    }

    /// Deliver queued notifications until the token is cancelled, then flush
    /// whatever is still queued.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Notification worker starting");

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(notification) => self.deliver(notification).await,
                    None => {
                        info!("Notification queue closed");
                        return;
                    }
                },
                _ = shutdown.cancelled() => break,
            }
        }

        self.rx.close();
        let mut flushed = 0usize;
        while let Ok(notification) = self.rx.try_recv() {
            self.deliver(notification).await;
            flushed += 1;
        }
        info!(flushed, "Notification worker shutting down");
    }

    async fn deliver(&self, notification: Notification) {
        let report = self.notifier.deliver(&notification).await;
        if report.success {
            info!(
                channel = ?notification.channel,
                template = notification.template.kind(),
                provider = report.provider,
                "Notification delivered"
            );
        } else {
            warn!(
                channel = ?notification.channel,
                template = notification.template.kind(),
                provider = report.provider,
                error = %report.detail,
                "Notification delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otp(code: &str) -> Template {
        Template::RegistrationOtp { code: code.into() }
    }

    #[test]
    fn dispatcher_enqueues_without_blocking() {
        let (dispatcher, mut rx) = NotificationDispatcher::channel(4);
        dispatcher.email("a@example.com", otp("111111"));
        dispatcher.sms("+919800000001", otp("111111"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.channel, Channel::Email);
        assert_eq!(first.target, "a@example.com");
        assert_eq!(rx.try_recv().unwrap().channel, Channel::Sms);
    }

    #[test]
    fn push_without_token_is_skipped() {
        let (dispatcher, mut rx) = NotificationDispatcher::channel(4);
        dispatcher.push(None, Template::KycApproved);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_instead_of_failing() {
        let (dispatcher, mut rx) = NotificationDispatcher::channel(1);
        dispatcher.email("a@example.com", otp("1"));
        dispatcher.email("b@example.com", otp("2"));

        assert_eq!(rx.try_recv().unwrap().target, "a@example.com");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_queue_does_not_panic() {
        let (dispatcher, rx) = NotificationDispatcher::channel(1);
        drop(rx);
        dispatcher.email("a@example.com", otp("1"));
    }

    #[tokio::test]
    async fn worker_flushes_queue_on_shutdown() {
        let (dispatcher, rx) = NotificationDispatcher::channel(8);
        for i in 0..3 {
            dispatcher.sms(format!("+91980000000{i}"), otp("123456"));
        }
        let worker = NotificationWorker::new(rx, Arc::new(Notifier::mock().unwrap()));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(5), worker.run(shutdown))
            .await
            .expect("worker should stop after flushing");
    }

    #[tokio::test]
    async fn mock_notifier_reports_success_per_channel() {
        let notifier = Notifier::mock().unwrap();
        for channel in [Channel::Email, Channel::Sms, Channel::Push] {
            let report = notifier
                .deliver(&Notification {
                    channel,
                    target: "ExponentPushToken[x]".into(),
                    template: Template::KycApproved,
                })
                .await;
            assert!(report.success, "{channel:?} should succeed");
        }
    }
}
