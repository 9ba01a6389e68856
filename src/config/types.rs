//! Core configuration types and loading.

use super::validation::{
    normalize_theme_color, validate_jinja_template, validate_template_render,
};
use crate::error::ConfigError;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the configuration file path.
pub const ENV_CONFIG_PATH: &str = "WAZE_ALERTS_CONFIG";

/// Main configuration structure.
///
/// Every section is optional; a missing file yields [`Config::default`].
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Title used for service notifications and exposed to body templates.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Feeds to poll, in order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Map services linked from each alert body.
    #[serde(default)]
    pub map_urls: MapUrls,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Malformed environment overrides, reported by `validate()`.
    #[serde(skip)]
    pub(crate) override_errors: Vec<String>,
}

fn default_service_name() -> String {
    "Waze Alerts".to_string()
}

fn default_poll_interval() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            webhook: WebhookConfig::default(),
            sources: Vec::new(),
            poll_interval_seconds: default_poll_interval(),
            alerts: AlertsConfig::default(),
            map_urls: MapUrls::default(),
            http: HttpConfig::default(),
            metrics: MetricsConfig::default(),
            override_errors: Vec::new(),
        }
    }
}

/// Delivery endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Target URL, may contain `${VAR}` references.
    #[serde(default)]
    pub url: Option<String>,
    /// Extra request headers; values may contain `${VAR}` references.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// minijinja template replacing the default card body.
    #[serde(default)]
    pub body_template: Option<String>,
    /// Card accent colour, `rrggbb` with an optional leading `#`.
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

fn default_theme_color() -> String {
    "0076D7".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            headers: BTreeMap::new(),
            body_template: None,
            theme_color: default_theme_color(),
        }
    }
}

/// A feed, either a bare URL or a named URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceConfig {
    Url(String),
    Named { name: String, url: String },
}

impl SourceConfig {
    /// Identifier used for watermarks and logs.
    pub fn id(&self) -> &str {
        match self {
            SourceConfig::Url(url) => url,
            SourceConfig::Named { name, .. } => name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            SourceConfig::Url(url) => url,
            SourceConfig::Named { url, .. } => url,
        }
    }
}

/// Alert filtering lists. `None` means "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub allowed_on: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_off: Option<Vec<String>>,
}

/// Ordered `name -> url template` mapping.
///
/// Keeps the order entries were written in. A repeated name replaces the
/// earlier template in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapUrls(pub Vec<(String, String)>);

impl MapUrls {
    pub fn insert(&mut self, name: String, template: String) {
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = template,
            None => self.0.push((name, template)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }
}

impl<'de> Deserialize<'de> for MapUrls {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapUrlsVisitor;

        impl<'de> Visitor<'de> for MapUrlsVisitor {
            type Value = MapUrls;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of map service names to URL templates")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut urls = MapUrls::default();
                while let Some((name, template)) = access.next_entry::<String, String>()? {
                    urls.insert(name, template);
                }
                Ok(urls)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(MapUrls::default())
            }
        }

        deserializer.deserialize_any(MapUrlsVisitor)
    }
}

/// Outbound HTTP settings shared by feed polling and delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_http_timeout(),
        }
    }
}

/// Metrics exposition configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text. An empty document gives the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Load from `path` when given, defaults otherwise, then apply
    /// environment overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check the whole configuration and report every problem found.
    ///
    /// An empty source list only logs a warning: the poll loop keeps
    /// waiting for sources instead of refusing to start.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` containing all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors: Vec<ConfigError> = self
            .override_errors
            .iter()
            .map(|e| ConfigError::ValidationError(e.clone()))
            .collect();

        match &self.webhook.url {
            Some(url) if !url.trim().is_empty() => {}
            _ => errors.push(ConfigError::MissingWebhook),
        }

        if self.poll_interval_seconds == 0 {
            errors.push(ConfigError::ValidationError(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.http.timeout.is_zero() {
            errors.push(ConfigError::ValidationError(
                "http.timeout must be greater than 0".to_string(),
            ));
        }

        if let Err(e) = normalize_theme_color(&self.webhook.theme_color) {
            errors.push(ConfigError::ValidationError(format!(
                "webhook.theme_color: {}",
                e
            )));
        }

        if let Some(template) = &self.webhook.body_template {
            let check =
                validate_jinja_template(template).and_then(|_| validate_template_render(template));
            if let Err(message) = check {
                errors.push(ConfigError::InvalidTemplate {
                    name: "webhook.body_template".to_string(),
                    message,
                });
            }
        }

        for name in self.webhook.headers.keys() {
            if name.trim().is_empty() {
                errors.push(ConfigError::ValidationError(
                    "webhook.headers: header name must not be empty".to_string(),
                ));
            }
        }

        for (index, source) in self.sources.iter().enumerate() {
            if source.url().trim().is_empty() {
                errors.push(ConfigError::ValidationError(format!(
                    "sources[{}]: url must not be empty",
                    index
                )));
            }
            if source.id().trim().is_empty() {
                errors.push(ConfigError::ValidationError(format!(
                    "sources[{}]: name must not be empty",
                    index
                )));
            }
        }

        for (name, template) in self.map_urls.iter() {
            if name.trim().is_empty() {
                errors.push(ConfigError::ValidationError(
                    "map_urls: service name must not be empty".to_string(),
                ));
            }
            if template.trim().is_empty() {
                errors.push(ConfigError::ValidationError(format!(
                    "map_urls: template for '{}' must not be empty",
                    name
                )));
            }
        }

        if self.sources.is_empty() {
            tracing::warn!("No sources configured, every poll cycle will be skipped");
        } else {
            let mut seen = HashSet::new();
            for source in &self.sources {
                if !seen.insert(source.id()) {
                    tracing::warn!(
                        feed = %source.id(),
                        "Source listed more than once, later entries share its watermark"
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
