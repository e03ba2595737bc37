//! Cube health checks.

use crate::client::CubeClient;
use telemetry::health;
use tracing::{debug, error};

/// Probe the Cube readiness endpoint and record the result in the health registry.
pub async fn check_connection(client: &CubeClient) -> bool {
    let failure = match client.http().get(client.config().ready_url()).send().await {
        Ok(response) if response.status().is_success() => {
            health().cube.set_healthy();
            debug!("Cube connection healthy");
            return true;
        }
        Ok(response) => format!("Readiness probe returned {}", response.status()),
        Err(e) => format!("Connection failed: {}", e),
    };

    error!(reason = %failure, "Cube health check failed");
    health().cube.set_unhealthy(failure);
    false
}
