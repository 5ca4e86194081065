// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use otc_desk_server::{
    api::router,
    config::{AppConfig, LOG_FORMAT_ENV},
    desk::seed::seed_defaults,
    notify::{NotificationDispatcher, NotificationWorker, Notifier, DEFAULT_QUEUE_CAPACITY},
    prices::PriceService,
    providers::{KycVerifier, PaymentProvider},
    state::AppState,
    storage::Database,
};

type StartupError = Box<dyn std::error::Error + Send + Sync>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

/// JSON logs when `LOG_FORMAT=json`, human-readable otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run() -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = AppConfig::from_env()?;
    let db = Database::open_in_dir(&config.data_dir)?;
    tracing::info!(data_dir = %config.data_dir.display(), "Storage opened");

    let notifier = Arc::new(Notifier::from_env()?);
    let prices = PriceService::from_env()?;
    let payments = PaymentProvider::from_env(&config.upi)?;
    let kyc = KycVerifier::from_env()?;
    tracing::info!(
        email = notifier.email.provider_name(),
        sms = notifier.sms.provider_name(),
        payments = payments.name(),
        kyc = kyc.name(),
        "Providers configured"
    );

    let (dispatcher, queue) = NotificationDispatcher::channel(DEFAULT_QUEUE_CAPACITY);
    let worker_shutdown = CancellationToken::new();
    let worker = tokio::spawn(NotificationWorker::new(queue, notifier).run(worker_shutdown.clone()));

    let addr: SocketAddr = config.bind_address().parse()?;
    let tls_paths = config
        .tls_paths()
        .map(|(cert, key)| (cert.clone(), key.clone()));
    let seed = config.seed_default_data;

    let state = AppState::new(db, config, dispatcher, prices, payments, kyc);

    if seed {
        let report = seed_defaults(
            &state.db,
            &state.auth,
            state.config.default_admin_password.as_deref(),
            None,
        )
        .await?;
        tracing::info!(
            admin_created = report.admin_created,
            rates_inserted = ?report.rates_inserted,
            "Startup seeding complete"
        );
    }

    let app = router(state);
    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    match tls_paths {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert, &key).await?;
            let handle = axum_server::Handle::new();
            let on_shutdown = handle.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                on_shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(%addr, "OTC desk listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "OTC desk listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .await?;
        }
    }

    tracing::info!("HTTP server stopped; draining notifications");
    worker_shutdown.cancel();
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Notification worker ended abnormally");
    }
    Ok(())
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
