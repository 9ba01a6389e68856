//! Runtime configuration compiled from a validated [`Config`].

use super::env::resolve_env_vars;
use super::secret::SecretString;
use super::types::{Config, MetricsConfig};
use super::validation::normalize_theme_color;
use crate::error::ConfigError;
use crate::feed::Source;
use crate::message::{MapLinks, MapService};
use crate::policy::AllowPolicy;
use std::collections::BTreeMap;
use std::time::Duration;

/// Runtime configuration after compilation.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub service_name: String,
    pub webhook: CompiledWebhook,
    pub sources: Vec<Source>,
    pub poll_interval: Duration,
    pub policy: AllowPolicy,
    pub map_links: MapLinks,
    pub http_timeout: Duration,
    pub metrics: MetricsConfig,
}

/// Webhook settings with secrets resolved.
#[derive(Debug, Clone)]
pub struct CompiledWebhook {
    pub url: SecretString,
    pub headers: BTreeMap<String, SecretString>,
    pub body_template: Option<String>,
    /// Colour without the leading `#`.
    pub theme_color: String,
}

impl Config {
    /// Compile configuration into runtime-ready form.
    ///
    /// Resolves `${VAR}` references in the webhook URL, header values and
    /// source URLs. Call after [`Config::validate`].
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingWebhook`] without a webhook URL, and
    /// [`ConfigError::ValidationError`] for undefined variables or a bad
    /// theme colour.
    pub fn compile(self) -> Result<RuntimeConfig, ConfigError> {
        let raw_url = self
            .webhook
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingWebhook)?;

        let url = resolve_env_vars(raw_url)
            .map_err(|e| ConfigError::ValidationError(format!("webhook.url: {}", e)))?;

        let mut headers = BTreeMap::new();
        for (name, value) in &self.webhook.headers {
            let resolved = resolve_env_vars(value).map_err(|e| {
                ConfigError::ValidationError(format!("webhook.headers.{}: {}", name, e))
            })?;
            headers.insert(name.clone(), SecretString::new(resolved));
        }

        let theme_color =
            normalize_theme_color(&self.webhook.theme_color).map_err(ConfigError::ValidationError)?;

        let sources = self
            .sources
            .iter()
            .map(|source| {
                resolve_env_vars(source.url())
                    .map(|url| Source::new(source.id(), url))
                    .map_err(|e| {
                        ConfigError::ValidationError(format!("source '{}': {}", source.id(), e))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let map_links = MapLinks::new(
            self.map_urls
                .iter()
                .map(|(name, template)| MapService::new(name, template))
                .collect(),
        );

        Ok(RuntimeConfig {
            service_name: self.service_name,
            webhook: CompiledWebhook {
                url: SecretString::new(url),
                headers,
                body_template: self.webhook.body_template,
                theme_color,
            },
            sources,
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            policy: AllowPolicy::new(self.alerts.allowed_on, self.alerts.allowed_off),
            map_links,
            http_timeout: self.http.timeout,
            metrics: self.metrics,
        })
    }
}
