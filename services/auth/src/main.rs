use anyhow::Result;
use common::{cache, database};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sims_auth::{
    AppState, Backends,
    config::{PortalConfig, SessionBackend, StorageBackend},
    janitor::start_session_janitor,
    password::Argon2Hasher,
    routes,
    session::{MemorySessionStore, PgSessionStore, RedisSessionStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting portal authentication service");

    let config = PortalConfig::load()?;
    let security = &config.security;
    let hasher = Arc::new(Argon2Hasher::with_params(
        security.argon2_memory_kib,
        security.argon2_iterations,
        security.argon2_parallelism,
    )?);

    let backends = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all accounts and sessions are lost on exit");
            if config.session.store != SessionBackend::Memory {
                warn!("session.store is ignored with the in-memory storage backend");
            }
            Backends::in_memory(hasher)
        }
        StorageBackend::Postgres => {
            let db_config = database::DatabaseConfig::from_env()?;
            let pool = database::init_pool(&db_config).await?;

            if database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }
            sims_auth::database::ensure_schema(&pool).await?;

            let sessions: Arc<dyn SessionStore> = match config.session.store {
                SessionBackend::Postgres => Arc::new(PgSessionStore::new(pool.clone())),
                SessionBackend::Redis => {
                    let redis_config = cache::RedisConfig::from_env()?;
                    let redis_pool = cache::RedisPool::new(&redis_config).await?;
                    Arc::new(RedisSessionStore::new(
                        redis_pool,
                        config.security.session_timeout_seconds,
                    ))
                }
                SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
            };

            Backends::postgres(pool, sessions, hasher)
        }
    };

    let bind_address = config.server.bind_address.clone();
    let sweep_schedule = config.session.sweep_schedule.clone();
    let bootstrap_password = config.storage.bootstrap_admin_password.clone();

    let state = AppState::new(config, backends)?;

    if let Some(password) = bootstrap_password.as_deref() {
        if sims_auth::database::seed_admin(state.auth.credentials(), password).await? {
            info!("Bootstrap administrator account created");
        }
    }

    let _janitor = if sweep_schedule.trim().is_empty() {
        None
    } else {
        Some(start_session_janitor(state.auth.sessions().clone(), &sweep_schedule).await?)
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_address).await?;
    info!("Portal authentication service listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
