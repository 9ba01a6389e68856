//! Notification text for actionable alerts.
//!
//! Turns a [`RawAlert`] into the title/body pair sent to the webhook:
//!
//! ```text
//! title: Pothole
//! body:  Rating: 3 | Confidence: 1 | Reliability: 7 | Coordinates: -74.0, 40.7 | Map: [Google Maps](https://maps.example/?q=40.7,-74.0)
//! ```

use crate::labels::{alert_subtype_label, alert_type_label};
use crate::parser::RawAlert;
use serde::Serialize;
use std::fmt::Display;

/// Title and body handed to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A named map service with a URL template using `{x}` and `{y}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapService {
    pub name: String,
    pub template: String,
}

impl MapService {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Substitute coordinates into the URL template.
    pub fn url(&self, x: &str, y: &str) -> String {
        self.template.replace("{x}", x).replace("{y}", y)
    }
}

/// Ordered list of map services rendered as markdown links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapLinks {
    services: Vec<MapService>,
}

impl MapLinks {
    /// Services are rendered in the order given.
    pub fn new(services: Vec<MapService>) -> Self {
        Self { services }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn services(&self) -> &[MapService] {
        &self.services
    }

    /// Render `Map: [name](url)` (or `Maps: ...` for several services).
    ///
    /// Returns an empty string when no service is configured.
    pub fn render(&self, x: impl Display, y: impl Display) -> String {
        if self.services.is_empty() {
            return String::new();
        }

        let (x, y) = (x.to_string(), y.to_string());
        let mut out = String::from(if self.services.len() == 1 {
            "Map: "
        } else {
            "Maps: "
        });

        for service in &self.services {
            out.push_str(&format!("[{}]({}) ", service.name, service.url(&x, &y)));
        }

        out.trim_end().to_string()
    }
}

/// Title for an alert: subtype label when a subtype is set, type label otherwise.
///
/// Unknown subtypes fall back to the raw subtype; unknown types without a
/// subtype yield an empty title.
pub fn alert_title(alert: &RawAlert) -> String {
    if alert.subtype.is_empty() {
        alert_type_label(&alert.alert_type)
            .unwrap_or_default()
            .to_string()
    } else {
        alert_subtype_label(&alert.subtype)
            .map(str::to_string)
            .unwrap_or_else(|| alert.subtype.clone())
    }
}

/// Build the notification for an actionable alert.
pub fn build_message(alert: &RawAlert, map_links: &MapLinks) -> NotificationMessage {
    let x = &alert.location.x;
    let y = &alert.location.y;

    let mut body = format!(
        "Rating: {} | Confidence: {} | Reliability: {} | Coordinates: {}, {}",
        alert.report_rating, alert.confidence, alert.reliability, x, y
    );

    let maps = map_links.render(x, y);
    if !maps.is_empty() {
        body.push_str(" | ");
        body.push_str(&maps);
    }

    NotificationMessage {
        title: alert_title(alert),
        body,
    }
}
