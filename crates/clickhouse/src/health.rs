//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use telemetry::health;
use tracing::{debug, error};

/// Probe ClickHouse and record the result in the health registry.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client
        .inner()
        .query("SELECT version()")
        .fetch_one::<String>()
        .await
    {
        Ok(version) => {
            health().clickhouse.set_healthy();
            debug!(version = %version, "ClickHouse connection healthy");
            true
        }
        Err(e) => {
            health()
                .clickhouse
                .set_unhealthy(format!("Connection failed: {}", e));
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}
