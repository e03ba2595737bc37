//! Dashboard Cache Refresher
//!
//! Keeps per-tenant, per-segment dashboard metrics precomputed:
//! - Staleness detection against a per-segment refresh watermark
//! - Slice-by-slice metric aggregation over the Cube query backend
//! - ClickHouse (or in-memory) dashboard cache
//! - Scheduled refresh rounds plus an on-demand refresh API

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{
    ClickHouseActivityStore, ClickHouseCacheStore, ClickHouseClient, ClickHouseConfig,
};
use cube_client::{CubeClient, CubeConfig};
use dashboard_core::{ActivityStore, CacheStore};
use telemetry::init_tracing_from_env;
use worker::{
    CacheBackend, MemoryCacheStore, ProcessWatermarkStore, RefreshConfig, RefreshOrchestrator,
    RefreshScheduler, RetryExecutor, RetryPolicy,
};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    cube: CubeConfig,

    #[serde(default)]
    refresh: RefreshConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            clickhouse: ClickHouseConfig::default(),
            cube: CubeConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Dashboard Cache Refresher v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        clickhouse_url = %config.clickhouse.url,
        cube_url = %config.cube.url,
        cache_backend = ?config.refresh.cache_backend,
        tenants = config.refresh.tenants.len(),
        "Loaded configuration"
    );

    // ClickHouse holds activity, watermarks, and (by default) the cache
    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    if let Err(e) = clickhouse_client::schema::init_schema(&clickhouse).await {
        error!("Failed to initialize ClickHouse schema: {}", e);
        // Continue anyway - schema might already exist
    }

    let cube = Arc::new(
        CubeClient::new(config.cube.clone()).context("Failed to create Cube client")?,
    );

    check_health(&clickhouse, &cube).await;

    // A memory cache keeps its watermarks in memory too, so a restart is a cold start
    let activity: Arc<dyn ActivityStore> =
        Arc::new(ClickHouseActivityStore::new(clickhouse.clone()));
    let (activity, cache): (Arc<dyn ActivityStore>, Arc<dyn CacheStore>) =
        match config.refresh.cache_backend {
            CacheBackend::Clickhouse => (
                activity,
                Arc::new(ClickHouseCacheStore::new(clickhouse.clone())),
            ),
            CacheBackend::Memory => {
                warn!("In-memory dashboard cache, entries and watermarks are lost on restart");
                (
                    Arc::new(ProcessWatermarkStore::new(activity)),
                    Arc::new(MemoryCacheStore::new()),
                )
            }
        };

    let orchestrator = Arc::new(RefreshOrchestrator::new(
        activity,
        cube.clone(),
        cache.clone(),
        RetryExecutor::new(RetryPolicy::from(&config.refresh)),
    ));

    // Scheduled refresh rounds
    let scheduler = Arc::new(RefreshScheduler::new(
        config.refresh.clone(),
        orchestrator.clone(),
    ));
    let _worker_handles = scheduler.start();

    let app = router(AppState::new(cache, orchestrator));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("DASHBOARD")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("DASHBOARD_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("DASHBOARD_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("DASHBOARD_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("DASHBOARD_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }

    if let Ok(url) = std::env::var("DASHBOARD_CUBE_URL") {
        config.cube.url = url;
    }
    if let Ok(token) = std::env::var("DASHBOARD_CUBE_TOKEN") {
        config.cube.token = Some(token);
    }

    if let Ok(tenants) = std::env::var("DASHBOARD_REFRESH_TENANTS") {
        config.refresh.tenants = tenants
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(clickhouse: &ClickHouseClient, cube: &CubeClient) {
    if clickhouse_client::health::check_connection(clickhouse).await {
        info!("ClickHouse connection: healthy");
    } else {
        error!("ClickHouse connection: unhealthy");
    }

    if cube_client::health::check_connection(cube).await {
        info!("Cube connection: healthy");
    } else {
        warn!("Cube connection: unhealthy, refreshes will fail until it recovers");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
