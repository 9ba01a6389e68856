//! Redacted holder for webhook URLs and header values.

use std::fmt;

/// A value that must only leave the process inside an HTTP request.
///
/// Formatting it, directly or through any `Debug` container, prints
/// `[REDACTED]`.
///
/// ```
/// use waze_alerts::config::SecretString;
///
/// let url = SecretString::new("https://outlook.example.com/webhook/abc".to_string());
/// assert_eq!(format!("{:?}", url), "[REDACTED]");
/// assert_eq!(url.expose(), "https://outlook.example.com/webhook/abc");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Raw value for building a request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompiledWebhook;
    use std::collections::BTreeMap;

    #[test]
    fn compiled_webhook_debug_hides_url_and_header_values() {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Authorization".to_string(),
            SecretString::from("Bearer teams-token-42".to_string()),
        );
        let webhook = CompiledWebhook {
            url: SecretString::from("https://outlook.example.com/webhook/abc123".to_string()),
            headers,
            body_template: None,
            theme_color: "0076D7".to_string(),
        };

        let debug = format!("{:?}", webhook);
        assert!(!debug.contains("abc123"), "{}", debug);
        assert!(!debug.contains("teams-token-42"), "{}", debug);
        // header names stay visible
        assert!(debug.contains("Authorization"), "{}", debug);
        assert_eq!(webhook.url.expose(), "https://outlook.example.com/webhook/abc123");
    }

    #[test]
    fn display_is_redacted() {
        let key = SecretString::new("feed-key-9f2".to_string());
        assert_eq!(key.to_string(), "[REDACTED]");
    }
}
