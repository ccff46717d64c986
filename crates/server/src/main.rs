//! Granary server: REST API for the mini-app plus the Telegram bot.
//!
//! # Architecture
//!
//! - Axum web framework, routes under `/api`
//! - Telegram Bot API long polling in a background task
//! - `PostgreSQL` for users, stock and access requests
//!
//! Both the HTTP server and the bot stop on Ctrl+C or SIGTERM.

#![cfg_attr(not(test), forbid(unsafe_code))]

use granary_server::bot::Bot;
use granary_server::config::AppConfig;
use granary_server::state::AppState;
use granary_server::{db, routes};
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "granary_server=info,tower_http=info".into());

    // JSON for log shippers, text for terminals
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p granary-cli -- migrate

    let addr = config.socket_addr();
    let polling = config.telegram.polling;
    let state = AppState::new(config, pool);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let bot_task = if polling {
        let bot = Bot::new(state.clone()).expect("Failed to build bot");
        Some(tokio::spawn(async move { bot.run(shutdown_rx).await }))
    } else {
        tracing::info!("Telegram polling disabled");
        None
    };

    tracing::info!("granary listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Receivers may already be gone if polling is off
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("Server error");

    if let Some(task) = bot_task
        && let Err(e) = task.await
    {
        tracing::error!(error = %e, "Bot task panicked");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
