//! Prometheus scrape endpoint for shipper metrics.

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the process-wide Prometheus recorder, serving `/metrics` on `addr`.
///
/// Must run inside the Tokio runtime, since the exporter spawns its listener
/// there. Fails when the address cannot be bound or a recorder is already set.
pub fn install_metrics_recorder(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("cannot serve metrics on {}: {}", addr, e))?;

    // descriptions are dropped unless a recorder is installed first
    logship_core::metrics::describe_metrics();

    if addr.ip().is_unspecified() {
        tracing::warn!(%addr, "metrics endpoint listens on all interfaces");
    }
    tracing::info!(%addr, "metrics endpoint listening");
    Ok(())
}
