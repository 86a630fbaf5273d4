mod booking;
mod config;
mod error;
mod extract;
mod handlers;
mod middleware;
mod models;
mod payloads;
mod repos;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::http::{self, HeaderValue, Method, header};
use chrono::Utc;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    repos::{PgBookingRepo, PgCarRepo, PgStatusRepo, Repos},
    services::{BookingNotifier, EmailNotifier, EmailSender, EmailSenderImpl, NoopNotifier},
    state::AppState,
    stores::{MemoryRateLimitStore, RateLimitStore, RateLimiter, RedisRateLimitStore, Stores},
};

#[derive(Parser)]
#[command(name = "sofcar-api")]
#[command(about = "SofCar booking API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = envy::prefixed("SOFCAR_").from_env::<Config>()?;

    // Guard must stay alive for the lifetime of the process
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // JSON logs in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let repos = Repos {
        cars: Arc::new(PgCarRepo::new(database.clone())),
        bookings: Arc::new(PgBookingRepo::new(database.clone())),
        status: Arc::new(PgStatusRepo::new(database)),
    };

    let policy = config.rate_limit_policy()?;
    let rate_limit_store: Arc<dyn RateLimitStore> = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Using Redis rate limit store");
            Arc::new(RedisRateLimitStore::new(redis::Client::open(url)?))
        }
        None => {
            tracing::warn!("SOFCAR_REDIS_URL not set, rate limits are per process");
            let store = Arc::new(MemoryRateLimitStore::new());
            spawn_eviction(store.clone(), policy.window);
            store
        }
    };
    let stores = Stores {
        rate_limiter: RateLimiter::new(rate_limit_store, policy),
    };

    let email: Option<Arc<dyn EmailSender>> = match EmailSenderImpl::new(
        config.resend_api_key.clone(),
        config.smtp_url.clone(),
        config.mail_from.clone(),
    ) {
        Ok(sender) => Some(Arc::new(sender)),
        Err(e) => {
            tracing::warn!("Email disabled: {e}");
            None
        }
    };
    let notifier: Arc<dyn BookingNotifier> = match &email {
        Some(sender) => Arc::new(EmailNotifier::new(
            sender.clone(),
            config.admin_email.clone(),
        )),
        None => Arc::new(NoopNotifier),
    };

    let cors = cors_layer(&config.cors_origins)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let state = AppState::new(config, repos, stores, notifier, email);

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = handlers::app(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB limit

    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    // Connect info is the client IP fallback when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");

    Ok(())
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Drops expired in-process counters once per window.
fn spawn_eviction(store: Arc<MemoryRateLimitStore>, window: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            match store.evict_expired(window, Utc::now()) {
                Ok(evicted) if evicted > 0 => {
                    tracing::debug!(evicted, remaining = store.len(), "evicted rate limit counters");
                }
                Ok(_) => {}
                Err(e) => tracing::error!("rate limit eviction failed: {e:?}"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
