//! Backend entry-point: loads settings, prepares persistence and serves the API.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::AppSettings;
use backend::inbound::http::health::HealthState;
use backend::inbound::http::session_config::fingerprint::key_fingerprint;
use backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use backend::outbound::persistence::{DbPool, PoolConfig, apply_migrations};
#[cfg(feature = "metrics")]
use server::default_metrics;
use server::{ServerConfig, create_server};

/// Run migrations and open the pool when a database is configured.
async fn connect_database(settings: &AppSettings) -> io::Result<Option<DbPool>> {
    let Some(url) = settings.database_url() else {
        return Ok(None);
    };
    apply_migrations(url).await.map_err(io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.db_max_connections()))
        .await
        .map_err(io::Error::other)?;
    Ok(Some(pool))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| io::Error::other(format!("load settings: {err}")))?;
    let env = DefaultEnv::new();
    let session = session_settings_from_env(&env, BuildMode::from_debug_assertions())
        .map_err(io::Error::other)?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        "session key loaded"
    );

    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;
    let mut config = ServerConfig::new(
        session.key,
        session.cookie_secure,
        session.same_site,
        bind_addr,
    )
    .with_upload_root(settings.upload_root())
    .with_cors_origins(settings.cors_origins());

    if let Some(url) = settings.detector_url().map_err(io::Error::other)? {
        config = config.with_detector(url, settings.detector_timeout());
    }
    if let Some(pool) = connect_database(&settings).await? {
        config = config.with_db_pool(pool);
    }
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(default_metrics());

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting server");
    create_server(health_state, config)?.await
}
