use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tenant_gate::config::{self, SessionDriver};
use tenant_gate::database::{DatabaseManager, PgDirectory, PgSessionStore};
use tenant_gate::directory::InMemoryDirectory;
use tenant_gate::routes::app;
use tenant_gate::session::{MemorySessionStore, SessionStore};
use tenant_gate::state::{AppState, CentralBackend};
use tenant_gate::tenancy::PgTenantConnector;

#[derive(Parser)]
#[command(name = "tenant-gate")]
#[command(about = "Multi-tenant access core HTTP server")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Serve the central directory from a YAML fixture instead of Postgres
    #[arg(long, env = "TENANT_GATE_FIXTURE")]
    fixture: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = config::config();
    tracing::info!("Starting tenant-gate in {:?} mode", config.environment);

    let state = build_state(&cli).await?;
    spawn_sweeper(state.clone(), Duration::from_secs(config.tenancy.sweep_interval_secs));

    let bind_addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("tenant-gate listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    DatabaseManager::close_all().await;
    Ok(())
}

async fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let config = config::config();

    let sessions: Arc<dyn SessionStore> = match (&cli.fixture, config.session.driver) {
        (Some(_), _) | (None, SessionDriver::Memory) => Arc::new(MemorySessionStore::new()),
        (None, SessionDriver::Database) => {
            let pool = DatabaseManager::central_pool().await?;
            Arc::new(PgSessionStore::new(pool))
        }
    };

    let prefix = config.tenancy.permission_cache_prefix.clone();
    let ttl = Duration::from_secs(config.tenancy.permission_cache_ttl_secs);

    match &cli.fixture {
        Some(path) => {
            let directory = Arc::new(
                InMemoryDirectory::load(path).with_context(|| format!("loading fixture {}", path.display()))?,
            );
            tracing::info!("Serving central directory from fixture {}", path.display());
            Ok(AppState::new(
                CentralBackend::Fixture,
                directory.clone(),
                directory.clone(),
                directory,
                sessions,
                prefix,
                ttl,
            ))
        }
        None => {
            let directory = Arc::new(PgDirectory::connect().await?);
            Ok(AppState::new(
                CentralBackend::Postgres,
                directory.clone(),
                directory,
                Arc::new(PgTenantConnector),
                sessions,
                prefix,
                ttl,
            ))
        }
    }
}

/// Periodically drops expired sessions and permission cache entries.
fn spawn_sweeper(state: AppState, every: Duration) {
    if every.is_zero() {
        tracing::warn!("Sweep interval is zero; expired sessions are never purged");
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match state.purge_expired().await {
                Ok((0, 0)) => {}
                Ok((sessions, permissions)) => {
                    tracing::debug!("Purged {} sessions and {} permission entries", sessions, permissions);
                }
                Err(e) => tracing::error!("Session sweep failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
