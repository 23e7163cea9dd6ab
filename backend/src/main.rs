//! PomoDeep Backend
//!
//! Account signup, signin and bearer-token authentication for the
//! PomoDeep API.
//!
//! ## Layout
//!
//! - Routes: HTTP handlers and the authentication gate
//! - Services: signup/signin rules and request deadlines
//! - Repositories: account storage (PostgreSQL or in-memory)
//! - Auth: password hashing and token issuance/validation

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use pomodeep_backend::{
    config::AppConfig,
    db,
    repositories::{memory::MemoryAccountStore, user::PgAccountStore, AccountStore},
    routes,
    state::AppState,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MIN_PRODUCTION_KEY_LEN: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting PomoDeep backend"
    );

    if AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    let store = open_store(&config).await?;

    let mut state = AppState::new(store, config.clone());
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!(error = %e, "Metrics recorder unavailable; /metrics disabled"),
    }

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Pick the account store backend
async fn open_store(config: &AppConfig) -> Result<Arc<dyn AccountStore>> {
    if config.database.in_memory {
        warn!("Using in-memory account store; accounts are lost on restart");
        return Ok(Arc::new(MemoryAccountStore::new()));
    }

    info!("Connecting to database...");
    let pool = db::connect(&config.database).await?;

    // Production runs migrations as a separate job
    if !AppConfig::is_production() {
        db::run_migrations(&pool).await?;
    }

    Ok(Arc::new(PgAccountStore::new(pool)))
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if AppConfig::is_production() {
            "pomodeep_backend=info,tower_http=info".into()
        } else {
            "pomodeep_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if AppConfig::is_production() {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Refuse to start production with a guessable signing key
fn validate_production_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    match config.auth.signing_key.as_ref() {
        None => errors.push("JWT_SECRET must be set in production"),
        Some(key) => {
            let key = key.expose_secret();
            if key.contains("development")
                || key == pomodeep_backend::auth::DEVELOPMENT_SIGNING_KEY
                || key.len() < MIN_PRODUCTION_KEY_LEN
            {
                errors.push("JWT secret must be at least 32 characters and not a development key");
            }
        }
    }

    if config.database.in_memory {
        warn!("In-memory account store enabled in production");
    }

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {}", err);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
