//! # SolarMart API Server
//!
//! Loads configuration from the environment (and `.env`), connects to
//! PostgreSQL, applies migrations, creates the bootstrap administrator when
//! configured, and serves the REST API until Ctrl-C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/solarmart JWT_SECRET=... cargo run -p solarmart-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines and `RUST_LOG` to override the
//! default filter.

use anyhow::Context;
use solarmart_api::{
    app::{build_router, AppState},
    bootstrap,
    config::Config,
};
use solarmart_shared::db::{
    migrations::{ensure_database_exists, get_migration_status, run_migrations},
    pool::{close_pool, create_pool, DatabaseConfig},
};
use solarmart_shared::models::token_blacklist::TokenBlacklist;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "solarmart_api=debug,solarmart_shared=debug,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before the log filter is read
    dotenvy::dotenv().ok();
    init_tracing();

    info!("SolarMart API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Invalid configuration")?;

    if !config.api.production {
        ensure_database_exists(&config.database.url)
            .await
            .context("Failed to create development database")?;
    }

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to PostgreSQL")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;
    let status = get_migration_status(&pool).await?;
    info!(
        applied = status.applied_migrations,
        latest = ?status.latest_version,
        "Migration status"
    );

    bootstrap::ensure_admin(&pool, &config.bootstrap).await?;

    let purged = TokenBlacklist::purge_expired(&pool).await?;
    if purged > 0 {
        info!(purged, "Dropped expired token blacklist entries");
    }

    tokio::fs::create_dir_all(&config.api.media_root)
        .await
        .with_context(|| format!("Failed to create media root {}", config.api.media_root.display()))?;

    let address = config.bind_address();
    let state = AppState::from_config(pool.clone(), config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing database pool");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
