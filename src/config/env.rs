//! Environment variable substitution and overrides.

use super::types::{Config, MapUrls, SourceConfig};
use crate::error::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

/// Webhook URL override.
pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";
/// Comma-separated feed URLs, replacing `sources`.
pub const ENV_WAZE_URLS: &str = "WAZE_URLS";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECONDS";
/// Comma-separated allow-list. Empty means "no restriction".
pub const ENV_ALERT_ON: &str = "ALERT_ON";
pub const ENV_ALERT_OFF: &str = "ALERT_OFF";
/// JSON object of map service name to URL template.
pub const ENV_MAP_URLS: &str = "MAP_URLS";

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Resolves `${VAR_NAME}` patterns in a string.
pub fn resolve_env_vars(value: &str) -> Result<String, ConfigError> {
    let mut result = value.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR_REGEX.captures_iter(value) {
        let full_match = &cap[0];
        let var_name = &cap[1];

        match std::env::var(var_name) {
            Ok(var_value) => {
                result = result.replace(full_match, &var_value);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(ConfigError::ValidationError(format!(
            "undefined environment variable{}: {}",
            if errors.len() > 1 { "s" } else { "" },
            errors.join(", ")
        )))
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
///
/// Returns `None` when nothing is left.
pub fn parse_token_list(value: &str) -> Option<Vec<String>> {
    let tokens: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if tokens.is_empty() { None } else { Some(tokens) }
}

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Malformed values are kept aside and reported by `validate()`.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            if !url.trim().is_empty() {
                self.webhook.url = Some(url.trim().to_string());
            }
        }

        if let Some(urls) = lookup(ENV_WAZE_URLS) {
            self.sources = parse_token_list(&urls)
                .unwrap_or_default()
                .into_iter()
                .map(SourceConfig::Url)
                .collect();
        }

        if let Some(interval) = lookup(ENV_POLL_INTERVAL) {
            match interval.trim().parse::<u64>() {
                Ok(seconds) => self.poll_interval_seconds = seconds,
                Err(_) => self.override_errors.push(format!(
                    "{}: '{}' is not a whole number of seconds",
                    ENV_POLL_INTERVAL, interval
                )),
            }
        }

        if let Some(on) = lookup(ENV_ALERT_ON) {
            self.alerts.allowed_on = parse_token_list(&on);
        }

        if let Some(off) = lookup(ENV_ALERT_OFF) {
            self.alerts.allowed_off = parse_token_list(&off);
        }

        if let Some(maps) = lookup(ENV_MAP_URLS) {
            if !maps.trim().is_empty() {
                match serde_json::from_str::<MapUrls>(&maps) {
                    Ok(urls) => self.map_urls = urls,
                    Err(e) => self
                        .override_errors
                        .push(format!("{}: invalid JSON object: {}", ENV_MAP_URLS, e)),
                }
            }
        }
    }
}
