//! Configuration loading and validation.
//!
//! Settings come from an optional YAML file, then environment overrides
//! (`WEBHOOK_URL`, `WAZE_URLS`, ...). Secrets referenced as `${VAR}` are
//! resolved when the configuration is compiled.

mod env;
mod runtime;
mod secret;
mod types;
mod validation;

pub use env::{
    ENV_ALERT_OFF, ENV_ALERT_ON, ENV_MAP_URLS, ENV_POLL_INTERVAL, ENV_WAZE_URLS, ENV_WEBHOOK_URL,
    parse_token_list, resolve_env_vars,
};
pub use runtime::{CompiledWebhook, RuntimeConfig};
pub use secret::SecretString;
pub use types::{
    AlertsConfig, Config, ENV_CONFIG_PATH, HttpConfig, MapUrls, MetricsConfig, SourceConfig,
    WebhookConfig,
};
pub use validation::validate_template_render;
