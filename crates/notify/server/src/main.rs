//! Notify Server - push notification dispatch over FCM.

mod config;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use color_eyre::eyre::WrapErr as _;
use notify_push::{CredentialStore, Dispatcher, FcmGateway, OAuthTokenExchange, ServiceAccountKey};
use notify_service::{Notify, NotifyService};
use tower_http::trace::TraceLayer;

use crate::config::Config;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("notify-server starting");

    let config = Config::load().wrap_err("failed to load config")?;

    // Initialize storage
    let storage = notify_storage::SqliteStorage::new(&config.database_url)
        .wrap_err("failed to initialize storage")?;

    storage
        .run_migrations()
        .wrap_err("failed to run migrations")?;

    // Gateway credentials
    let key = ServiceAccountKey::from_file(config.push.service_account_path()?)?;
    tracing::info!(project_id = %key.project_id, client_email = %key.client_email, "loaded service account");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.push.request_timeout_secs))
        .build()
        .wrap_err("failed to build HTTP client")?;

    let exchange = OAuthTokenExchange::new(http.clone(), &key, config.push.scope.as_str())
        .wrap_err("failed to load service account signing key")?;
    let credentials = CredentialStore::new(exchange)
        .with_refresh_margin(chrono::Duration::seconds(config.push.refresh_margin_secs));

    // Create notification service
    let dispatcher = Dispatcher::new(credentials, FcmGateway::new(http, &key.project_id))
        .with_max_in_flight(config.push.max_in_flight);
    let service = Arc::new(NotifyService::new(storage, dispatcher));

    if let Some(secs) = config.sweep.interval_secs {
        tracing::info!(interval_secs = secs, "periodic reminder sweep enabled");
        tokio::spawn(sweep_periodically(service.clone(), Duration::from_secs(secs)));
    }

    // Build router
    let app = Router::new()
        .merge(notify_http::notify_router(service))
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!(addr = %config.listen_addr, "listening");

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .wrap_err("failed to bind")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    tracing::info!("notify-server stopped");

    Ok(())
}

async fn sweep_periodically<N: Notify + 'static>(service: Arc<N>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match service.sweep_due(Utc::now()).await {
            Ok(report) if !report.is_retired() => {
                tracing::error!(
                    processed = report.processed,
                    error = report.retire_error.as_deref().unwrap_or_default(),
                    "periodic sweep could not retire reminders"
                );
            }
            Ok(report) if report.processed > 0 => {
                tracing::info!(
                    processed = report.processed,
                    succeeded = report.succeeded(),
                    "periodic sweep"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = ?e, "periodic sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
