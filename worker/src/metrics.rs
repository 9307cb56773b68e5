//! Prometheus metrics exporter bootstrap.
//!
//! The reconciler's crates emit counters through the `metrics` facade
//! (`reconciler.events.*`, `stock_store.deltas.*`). Installing the exporter
//! is optional: without it the counters are no-ops.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from installing the metrics exporter.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter could not be built or installed.
    #[error("failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install a Prometheus exporter serving `/metrics` on `addr`.
///
/// Must be called at most once, from within a tokio runtime.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed or
/// the listener cannot be set up.
pub fn install_exporter(addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    tracing::info!(addr = %addr, "Prometheus metrics exporter listening");
    Ok(())
}
