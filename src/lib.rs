//! waze-alerts - relay new Waze traffic alerts to a chat webhook.
//!
//! Polls one or more Waze partner feeds, keeps only records published
//! since the previous poll, filters alerts against an allow-list and posts
//! one notification per actionable alert.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod labels;
pub mod message;
pub mod metrics;
pub mod notify;
pub mod parser;
pub mod policy;
pub mod watermark;

// Re-export commonly used types
pub use cli::LogFormat;
pub use engine::{CycleSummary, EngineSettings, PollEngine, Shutdown, StopReason};
pub use feed::{Batch, Fetcher, Source};
pub use message::{MapLinks, MapService, NotificationMessage, build_message};
pub use metrics::{MetricsServer, initialize_metrics, register_metric_descriptions};
pub use notify::{MessageCard, Notifier, WebhookNotifier};
pub use parser::{FeedResponse, RawAlert, RawJam, parse_feed};
pub use policy::AllowPolicy;
pub use watermark::WatermarkStore;
