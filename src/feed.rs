//! Feed polling and per-source deduplication.
//!
//! The [`Fetcher`] walks the configured sources in order, one GET per
//! source, and merges everything published after each source's watermark
//! into a single [`Batch`]. A failing source is logged and skipped; the
//! others still contribute.

use std::time::Instant;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::parser::{FeedResponse, RawAlert, RawJam, parse_feed};
use crate::watermark::WatermarkStore;

/// A configured feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Identifier used for watermarks, logs and metric labels.
    pub id: String,
    pub url: String,
}

impl Source {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// New records gathered during one poll cycle, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<RawAlert>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jams: Vec<RawJam>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty() && self.jams.is_empty()
    }
}

/// Polls the configured sources and owns their watermarks.
pub struct Fetcher {
    client: Client,
    sources: Vec<Source>,
    watermarks: WatermarkStore,
}

impl Fetcher {
    /// Create a fetcher with every source's watermark at zero.
    pub fn new(client: Client, sources: Vec<Source>) -> Self {
        let watermarks = WatermarkStore::seeded(sources.iter().map(|s| s.id.clone()));
        Self {
            client,
            sources,
            watermarks,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Read-only view of the current watermarks.
    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    /// Poll every source once and return the records not seen before.
    ///
    /// Per-source failures are logged and counted here and never surface
    /// to the caller.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::NoSources` when no source is configured.
    pub async fn fetch_all(&mut self) -> Result<Batch, FetchError> {
        if self.sources.is_empty() {
            return Err(FetchError::NoSources);
        }

        let mut batch = Batch::default();

        for source in &self.sources {
            match fetch_source(&self.client, source).await {
                Ok(response) => {
                    absorb_into(&mut self.watermarks, &source.id, response, &mut batch);
                }
                Err(e) => record_fetch_error(&e),
            }
        }

        Ok(batch)
    }

    /// Merge an already-decoded response for `source_id` into `batch`.
    ///
    /// Keeps records published strictly after the source's watermark, then
    /// moves the watermark to the response's `endTimeMillis` if it has one.
    pub fn absorb(&mut self, source_id: &str, response: FeedResponse, batch: &mut Batch) {
        absorb_into(&mut self.watermarks, source_id, response, batch);
    }
}

async fn fetch_source(client: &Client, source: &Source) -> Result<FeedResponse, FetchError> {
    let start = Instant::now();

    let response = client
        .get(&source.url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| FetchError::Transport {
            feed: source.id.clone(),
            message: e.without_url().to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            feed: source.id.clone(),
            status: status.as_u16(),
        });
    }

    // reqwest errors carry the request URL, which may embed a partner key
    let body = response.text().await.map_err(|e| FetchError::Transport {
        feed: source.id.clone(),
        message: e.without_url().to_string(),
    })?;

    metrics::histogram!("waze_alerts_fetch_duration_seconds", "feed" => source.id.clone())
        .record(start.elapsed().as_secs_f64());

    parse_feed(&body).map_err(|error| FetchError::Parse {
        feed: source.id.clone(),
        error,
    })
}

fn absorb_into(
    watermarks: &mut WatermarkStore,
    source_id: &str,
    response: FeedResponse,
    batch: &mut Batch,
) {
    let watermark = watermarks.get(source_id);

    for reason in &response.invalid_records {
        warn!(feed = %source_id, reason = %reason, "Skipping malformed feed record");
    }
    if !response.invalid_records.is_empty() {
        metrics::counter!(
            "waze_alerts_fetch_errors_total",
            "feed" => source_id.to_string(),
            "error_type" => "record"
        )
        .increment(response.invalid_records.len() as u64);
    }

    let alerts_before = batch.alerts.len();
    let jams_before = batch.jams.len();

    batch.alerts.extend(
        response
            .alerts
            .into_iter()
            .filter(|a| a.pub_millis > watermark),
    );
    batch
        .jams
        .extend(response.jams.into_iter().filter(|j| j.pub_millis > watermark));

    let new_alerts = batch.alerts.len() - alerts_before;
    let new_jams = batch.jams.len() - jams_before;

    metrics::counter!("waze_alerts_alerts_fetched_total", "feed" => source_id.to_string())
        .increment(new_alerts as u64);
    metrics::counter!("waze_alerts_jams_fetched_total", "feed" => source_id.to_string())
        .increment(new_jams as u64);

    if let Some(end) = response.end_time_millis {
        watermarks.set(source_id, end);
        metrics::gauge!("waze_alerts_watermark_millis", "feed" => source_id.to_string())
            .set(end as f64);
    }

    debug!(
        feed = %source_id,
        new_alerts,
        new_jams,
        previous_watermark = watermark,
        watermark = watermarks.get(source_id),
        "Feed absorbed"
    );
}

/// Log a per-source fetch failure and count it.
pub fn record_fetch_error(err: &FetchError) {
    let (feed, error_type) = match err {
        FetchError::NoSources => ("", "no_sources"),
        FetchError::Transport { feed, .. } => (feed.as_str(), "transport"),
        FetchError::HttpStatus { feed, .. } => (feed.as_str(), "http_status"),
        FetchError::Parse { feed, .. } => (feed.as_str(), "parse"),
    };

    error!(feed = %feed, error_type, error = %err, "Failed to fetch feed, skipping for this cycle");

    metrics::counter!(
        "waze_alerts_fetch_errors_total",
        "feed" => feed.to_string(),
        "error_type" => error_type
    )
    .increment(1);
}
