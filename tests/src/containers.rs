//! ClickHouse for store tests.
//!
//! `DASHBOARD_TEST_CLICKHOUSE_URL` points the tests at an existing server;
//! otherwise a `clickhouse-server` container is started per context.

use std::time::{Duration, Instant};
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

const IMAGE: &str = "clickhouse/clickhouse-server";
const TAG: &str = "24.3";
const DATABASE: &str = "dashboard";
const HTTP_PORT: u16 = 8123;

/// A reachable ClickHouse server, kept alive for as long as this value lives.
pub struct TestContainers {
    #[allow(dead_code)]
    clickhouse: Option<ContainerAsync<GenericImage>>,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_username: Option<String>,
    pub clickhouse_password: Option<String>,
}

impl TestContainers {
    pub async fn start() -> Self {
        match Self::from_env() {
            Some(external) => external,
            None => Self::from_container().await,
        }
    }

    fn from_env() -> Option<Self> {
        let url = std::env::var("DASHBOARD_TEST_CLICKHOUSE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())?;

        Some(Self {
            clickhouse: None,
            clickhouse_url: url,
            clickhouse_database: std::env::var("DASHBOARD_TEST_CLICKHOUSE_DB")
                .unwrap_or_else(|_| DATABASE.to_string()),
            clickhouse_username: std::env::var("DASHBOARD_TEST_CLICKHOUSE_USER").ok(),
            clickhouse_password: std::env::var("DASHBOARD_TEST_CLICKHOUSE_PASSWORD").ok(),
        })
    }

    async fn from_container() -> Self {
        // Empty default password needs access management enabled
        let container = GenericImage::new(IMAGE, TAG)
            .with_wait_for(WaitFor::seconds(5))
            .with_exposed_port(HTTP_PORT.tcp())
            .with_env_var("CLICKHOUSE_DB", DATABASE)
            .with_env_var("CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT", "1")
            .with_env_var("CLICKHOUSE_USER", "default")
            .with_env_var("CLICKHOUSE_PASSWORD", "")
            .start()
            .await
            .expect("Failed to start ClickHouse");

        let port = container
            .get_host_port_ipv4(HTTP_PORT)
            .await
            .expect("ClickHouse HTTP port not mapped");
        let url = format!("http://127.0.0.1:{}", port);

        wait_for_ping(&url, Duration::from_secs(30)).await;

        Self {
            clickhouse: Some(container),
            clickhouse_url: url,
            clickhouse_database: DATABASE.to_string(),
            clickhouse_username: Some("default".to_string()),
            clickhouse_password: None,
        }
    }
}

/// Poll `/ping` until the server accepts queries.
async fn wait_for_ping(url: &str, timeout: Duration) {
    let client = reqwest::Client::new();
    let ping = format!("{}/ping", url);
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        let ready = client
            .get(&ping)
            .send()
            .await
            .is_ok_and(|resp| resp.status().is_success());
        if ready {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    panic!("ClickHouse at {} not ready after {:?}", url, timeout);
}
