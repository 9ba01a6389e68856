//! Poll engine driving the fetch, filter and notify pipeline.
//!
//! One cooperative loop on the current task:
//!
//! ```text
//! start notification
//!     |
//!     v
//! +-> Fetcher::fetch_all --> AllowPolicy::filter_actionable --> build_message --> Notifier::send
//! |                                                                                  |
//! +------------------------------ sleep(poll_interval) <-----------------------------+
//!                                      |
//!                                 shutdown signal
//!                                      |
//!                                      v
//!                              stop notification
//! ```
//!
//! Only the sleep observes the shutdown signal; a cycle in progress runs to
//! completion first.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RuntimeConfig;
use crate::error::{FetchError, PollError};
use crate::feed::Fetcher;
use crate::message::{MapLinks, NotificationMessage, build_message};
use crate::notify::Notifier;
use crate::policy::AllowPolicy;

/// Why the engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Termination request (SIGTERM).
    Terminate,
    /// Keyboard interrupt (Ctrl-C).
    Interrupt,
}

impl StopReason {
    /// Text of the "service stopped" notification.
    pub fn message(&self, service_name: &str) -> String {
        match self {
            StopReason::Terminate => format!("{} has been stopped.", service_name),
            StopReason::Interrupt => {
                format!("{} has been stopped by keyboard interrupt.", service_name)
            }
        }
    }
}

/// Shutdown signal carrying its reason.
///
/// Clones share the same token and reason. The first trigger wins.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop.
    pub fn trigger(&self, reason: StopReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reason of the first trigger; `Terminate` if the token was cancelled
    /// some other way.
    pub fn reason(&self) -> StopReason {
        self.reason.get().copied().unwrap_or(StopReason::Terminate)
    }

    /// Token for tasks that only need to know when to stop (metrics server).
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Counts for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub alerts: usize,
    pub jams: usize,
    pub actionable: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Engine settings taken from the runtime configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub service_name: String,
    pub poll_interval: Duration,
    pub policy: AllowPolicy,
    pub map_links: MapLinks,
}

impl EngineSettings {
    pub fn from_runtime(config: &RuntimeConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            poll_interval: config.poll_interval,
            policy: config.policy.clone(),
            map_links: config.map_links.clone(),
        }
    }
}

/// Runs poll cycles until shut down.
pub struct PollEngine {
    settings: EngineSettings,
    fetcher: Fetcher,
    notifier: Arc<dyn Notifier>,
}

impl PollEngine {
    pub fn new(settings: EngineSettings, fetcher: Fetcher, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            settings,
            fetcher,
            notifier,
        }
    }

    /// Run until `shutdown` is triggered, then send the stop notification.
    ///
    /// Returns the reason the engine stopped.
    pub async fn run(mut self, shutdown: Shutdown) -> StopReason {
        let started = format!("{} is now running.", self.settings.service_name);
        self.notify_service(&started).await;

        info!(
            sources = self.fetcher.sources().len(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            notifier = %self.notifier.name(),
            "Poll engine started"
        );

        loop {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(Ok(summary)) => {
                    debug!(
                        alerts = summary.alerts,
                        jams = summary.jams,
                        actionable = summary.actionable,
                        delivered = summary.delivered,
                        failed = summary.failed,
                        "Poll cycle complete"
                    );
                }
                Ok(Err(PollError::Fetch(FetchError::NoSources))) => {
                    warn!(
                        retry_in_secs = self.settings.poll_interval.as_secs(),
                        "No sources configured, waiting"
                    );
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Poll cycle failed");
                }
                Err(panic) => {
                    error!(panic = %panic_message(panic.as_ref()), "Poll cycle panicked - CRITICAL");
                    metrics::counter!("waze_alerts_cycle_panics_total").increment(1);
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        let reason = shutdown.reason();
        info!(reason = ?reason, "Poll engine stopping");

        let stopped = reason.message(&self.settings.service_name);
        self.notify_service(&stopped).await;

        reason
    }

    /// Fetch once and relay every actionable alert, in order.
    ///
    /// # Errors
    ///
    /// Returns `PollError::Fetch(FetchError::NoSources)` when no source is
    /// configured. Delivery failures are logged and counted, not returned.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary, PollError> {
        let batch = self.fetcher.fetch_all().await?;

        metrics::gauge!("waze_alerts_last_poll_timestamp")
            .set(chrono::Utc::now().timestamp() as f64);

        let actionable = self.settings.policy.filter_actionable(&batch.alerts);

        let mut summary = CycleSummary {
            alerts: batch.alerts.len(),
            jams: batch.jams.len(),
            actionable: actionable.len(),
            ..CycleSummary::default()
        };

        metrics::counter!("waze_alerts_alerts_actionable_total").increment(summary.actionable as u64);
        metrics::counter!("waze_alerts_alerts_filtered_total")
            .increment((summary.alerts - summary.actionable) as u64);

        for alert in actionable {
            let message = build_message(alert, &self.settings.map_links);

            info!(
                alert_type = %alert.alert_type,
                subtype = %alert.subtype,
                published = %format_pub_millis(alert.pub_millis),
                title = %message.title,
                "Relaying alert"
            );

            match self.notifier.send(&message).await {
                Ok(()) => summary.delivered += 1,
                Err(e) => {
                    error!(
                        notifier = %self.notifier.name(),
                        alert_type = %alert.alert_type,
                        error = %e,
                        "Failed to deliver alert, dropping"
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn notify_service(&self, text: &str) {
        let message = NotificationMessage::new(self.settings.service_name.as_str(), text);
        if let Err(e) = self.notifier.send(&message).await {
            error!(
                notifier = %self.notifier.name(),
                error = %e,
                "Failed to send service notification"
            );
        }
    }
}

fn format_pub_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
