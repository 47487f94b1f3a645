//! Time-lock service - Entry point.

use anyhow::Context;
use lock_store::{LockStore, MemoryLockStore, SqliteLockStore};
use std::net::SocketAddr;
use std::sync::Arc;
use timelock_service::{
    api::{create_router_with_rate_limit, AppState, SERVICES},
    config::Config,
    DurationPolicy, LockEngine, RateGovernor, RsaKeyGenerator,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.log.level, config.log.json);

    info!("Starting time-lock service");

    // Initialize storage
    let store: Arc<dyn LockStore> = if config.store.persist {
        let store = SqliteLockStore::open(&config.store.path)
            .with_context(|| format!("Failed to open lock database {:?}", config.store.path))?;
        Arc::new(store)
    } else {
        warn!("Persistence disabled, locks will be lost on restart");
        Arc::new(MemoryLockStore::new())
    };

    match store.count().await {
        Ok(n) => info!("Lock store ready with {} locks", n),
        Err(e) => error!("Failed to count stored locks: {}", e),
    }

    let keys = Arc::new(RsaKeyGenerator::new(config.keys.rsa_bits));
    info!("RSA key size: {} bits", config.keys.rsa_bits);

    let engine = LockEngine::new(store, keys, DurationPolicy::from(config.locks.clone()));
    let state = AppState::new(engine);

    // Create rate governor from config
    let governor = RateGovernor::new(
        config.rate_limit.create_per_minute,
        config.rate_limit.query_per_minute,
    );
    let cleanup = governor.spawn_cleanup(config.rate_limit.cleanup_interval);

    let app = create_router_with_rate_limit(
        state,
        governor,
        config.rate_limit.trust_forwarded_for,
    );

    for (path, name) in SERVICES {
        info!("Service registered: {} -> {}", path, name);
    }

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    // Run server
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    cleanup.abort();
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
