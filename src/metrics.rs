//! Prometheus metrics exposition server.
//!
//! Serves every `waze_alerts_*` metric on `/metrics` when enabled in the
//! configuration.

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

static RECORDER_INSTALLED: OnceLock<()> = OnceLock::new();

/// Register HELP text for all metrics.
///
/// Called once after the recorder is installed.
pub fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Counters
    describe_counter!(
        "waze_alerts_fetch_errors_total",
        "Feed failures by error_type (transport, http_status, parse) and skipped malformed records (record)"
    );
    describe_counter!(
        "waze_alerts_alerts_fetched_total",
        "New alerts received from a feed (after watermark deduplication)"
    );
    describe_counter!(
        "waze_alerts_jams_fetched_total",
        "New jams received from a feed (after watermark deduplication)"
    );
    describe_counter!(
        "waze_alerts_alerts_actionable_total",
        "Alerts accepted by the allow-list"
    );
    describe_counter!(
        "waze_alerts_alerts_filtered_total",
        "Alerts rejected by the allow-list"
    );
    describe_counter!(
        "waze_alerts_notifications_sent_total",
        "Notifications accepted by the webhook"
    );
    describe_counter!(
        "waze_alerts_notify_errors_total",
        "Notifications that could not be delivered"
    );
    describe_counter!(
        "waze_alerts_cycle_panics_total",
        "Poll cycles that panicked"
    );

    // Gauges
    describe_gauge!(
        "waze_alerts_watermark_millis",
        "Current per-feed watermark in milliseconds since epoch"
    );
    describe_gauge!(
        "waze_alerts_last_poll_timestamp",
        "Unix timestamp of the last poll cycle that reached the feeds"
    );
    describe_gauge!(
        "waze_alerts_build_info",
        "Build information with version label (always 1)"
    );

    // Histograms
    describe_histogram!(
        "waze_alerts_fetch_duration_seconds",
        "Time to download one feed response"
    );
}

/// Metrics server for Prometheus exposition.
pub struct MetricsServer {
    port: u16,
    /// Signalled once the recorder is installed, so callers can initialize
    /// metrics without losing them.
    ready_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MetricsServer {
    /// Use port 0 to let the OS pick one.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ready_tx: None,
        }
    }

    pub fn with_ready_signal(port: u16, ready_tx: tokio::sync::oneshot::Sender<()>) -> Self {
        Self {
            port,
            ready_tx: Some(ready_tx),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Install the global recorder and serve `/metrics` until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be installed (port in use,
    /// recorder already set).
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let addr: SocketAddr = ([0, 0, 0, 0], self.port).into();

        // The recorder can only be installed once per process
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

        let _ = RECORDER_INSTALLED.set(());

        register_metric_descriptions();

        if let Some(tx) = self.ready_tx {
            let _ = tx.send(());
        }

        info!(port = self.port, "Metrics server started on /metrics");

        cancel.cancelled().await;

        info!("Metrics server shutting down");

        Ok(())
    }
}

pub fn is_recorder_installed() -> bool {
    RECORDER_INSTALLED.get().is_some()
}

/// Publish every per-feed series at zero so they show up before the first poll.
pub fn initialize_metrics(feed_ids: &[&str]) {
    use metrics::{counter, gauge};

    gauge!("waze_alerts_build_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    gauge!("waze_alerts_last_poll_timestamp").set(0.0);

    counter!("waze_alerts_alerts_actionable_total").absolute(0);
    counter!("waze_alerts_alerts_filtered_total").absolute(0);
    counter!("waze_alerts_cycle_panics_total").absolute(0);

    for feed in feed_ids {
        counter!("waze_alerts_alerts_fetched_total", "feed" => feed.to_string()).absolute(0);
        counter!("waze_alerts_jams_fetched_total", "feed" => feed.to_string()).absolute(0);
        gauge!("waze_alerts_watermark_millis", "feed" => feed.to_string()).set(0.0);
    }

    tracing::info!(feed_count = feed_ids.len(), "Metrics initialized to zero");
}
