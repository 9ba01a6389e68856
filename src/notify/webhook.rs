//! Webhook notifier.
//!
//! Posts each message to a single HTTP endpoint. Without a `body_template`
//! the body is an Office 365 connector card:
//!
//! ```json
//! {"@type":"MessageCard","@context":"http://schema.org/extensions",
//!  "themeColor":"0076D7","title":"Pothole","text":"Rating: 3 | ..."}
//! ```

use crate::config::{CompiledWebhook, SecretString};
use crate::error::{ConfigError, NotifyError};
use crate::message::NotificationMessage;
use crate::notify::Notifier;
use async_trait::async_trait;
use minijinja::{Environment, context};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::str::FromStr;
use tracing::Instrument;

/// Office 365 connector card body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageCard {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor")]
    pub theme_color: String,
    pub title: String,
    pub text: String,
}

impl MessageCard {
    pub fn new(message: &NotificationMessage, theme_color: &str) -> Self {
        Self {
            card_type: "MessageCard",
            context: "http://schema.org/extensions",
            theme_color: theme_color.to_string(),
            title: message.title.clone(),
            text: message.body.clone(),
        }
    }
}

/// Render a body template. `text` and `body` both hold the message body.
fn render_body_template(
    source: &str,
    message: &NotificationMessage,
    service_name: &str,
) -> Result<String, NotifyError> {
    let mut env = Environment::new();
    env.add_template("body", source)
        .map_err(|e| NotifyError::Template(e.to_string()))?;

    let tmpl = env
        .get_template("body")
        .map_err(|e| NotifyError::Template(e.to_string()))?;

    tmpl.render(context! {
        title => &message.title,
        text => &message.body,
        body => &message.body,
        service_name => service_name,
    })
    .map_err(|e| NotifyError::Template(e.to_string()))
}

/// Notifier posting to a webhook URL, one attempt per message.
pub struct WebhookNotifier {
    name: String,
    service_name: String,
    client: reqwest::Client,
    url: SecretString,
    headers: HeaderMap,
    body_template: Option<String>,
    theme_color: String,
}

impl WebhookNotifier {
    /// Build a notifier from the compiled webhook settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when a header name or value
    /// cannot be sent over HTTP.
    pub fn from_config(
        name: &str,
        service_name: &str,
        config: &CompiledWebhook,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (key, value) in &config.headers {
            let header_name = HeaderName::from_str(key).map_err(|_| {
                ConfigError::ValidationError(format!("webhook: invalid header name '{}'", key))
            })?;
            let header_value = HeaderValue::from_str(value.expose()).map_err(|_| {
                ConfigError::ValidationError(format!(
                    "webhook: invalid value for header '{}'",
                    key
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            name: name.to_string(),
            service_name: service_name.to_string(),
            client,
            url: config.url.clone(),
            headers,
            body_template: config.body_template.clone(),
            theme_color: config.theme_color.clone(),
        })
    }

    /// Request body for `message`.
    pub fn render_body(&self, message: &NotificationMessage) -> Result<String, NotifyError> {
        match &self.body_template {
            Some(source) => render_body_template(source, message, &self.service_name),
            None => serde_json::to_string(&MessageCard::new(message, &self.theme_color))
                .map_err(|e| NotifyError::SendFailed(format!("JSON serialization error: {}", e))),
        }
    }

    fn count_error(&self) {
        metrics::counter!(
            "waze_alerts_notify_errors_total",
            "notifier_name" => self.name.clone(),
            "notifier_type" => "webhook"
        )
        .increment(1);
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn notifier_type(&self) -> &str {
        "webhook"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let span = tracing::info_span!(
            "send_webhook",
            notifier_name = %self.name,
            title = %message.title
        );

        async {
            let body = match self.render_body(message) {
                Ok(body) => body,
                Err(e) => {
                    self.count_error();
                    return Err(e);
                }
            };
            tracing::trace!(body_len = body.len(), "Request body built");

            let result = self
                .client
                .post(self.url.expose())
                .headers(self.headers.clone())
                .body(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(status = %response.status(), "Notification delivered");
                    metrics::counter!(
                        "waze_alerts_notifications_sent_total",
                        "notifier_name" => self.name.clone(),
                        "notifier_type" => "webhook"
                    )
                    .increment(1);
                    Ok(())
                }
                Ok(response) => {
                    self.count_error();
                    Err(NotifyError::Rejected {
                        status: response.status().as_u16(),
                    })
                }
                Err(e) => {
                    self.count_error();
                    // reqwest errors can carry the URL
                    Err(NotifyError::SendFailed(e.without_url().to_string()))
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("header_count", &self.headers.len())
            .field("has_body_template", &self.body_template.is_some())
            .finish()
    }
}
