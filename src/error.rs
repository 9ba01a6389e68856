//! Centralized error types for waze-alerts using thiserror.
//!
//! Each pipeline stage has its own error enum so callers can decide
//! precisely what is fatal (configuration) and what only skips a source or
//! a single delivery.

use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("webhook url is not set")]
    MissingWebhook,
    #[error("invalid template '{name}': {message}")]
    InvalidTemplate { name: String, message: String },
}

/// Errors raised while polling the configured feeds.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no sources configured")]
    NoSources,
    #[error("request to feed '{feed}' failed: {message}")]
    Transport { feed: String, message: String },
    #[error("feed '{feed}' returned HTTP {status}")]
    HttpStatus { feed: String, status: u16 },
    #[error("feed '{feed}' returned an unreadable body: {error}")]
    Parse { feed: String, error: ParseError },
}

/// Errors related to feed body decoding.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

/// Errors related to webhook delivery.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("webhook rejected notification with HTTP {status}")]
    Rejected { status: u16 },
    #[error("template render failed: {0}")]
    Template(String),
}

/// Outcome of a failed poll cycle.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::LoadError("file not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load config file: file not found"
        );

        let err = ConfigError::MissingWebhook;
        assert_eq!(err.to_string(), "webhook url is not set");
    }

    #[test]
    fn config_error_invalid_template_display() {
        let err = ConfigError::InvalidTemplate {
            name: "webhook.body_template".to_string(),
            message: "unexpected end of input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid template 'webhook.body_template': unexpected end of input"
        );
    }

    #[test]
    fn fetch_error_display() {
        assert_eq!(FetchError::NoSources.to_string(), "no sources configured");

        let err = FetchError::HttpStatus {
            feed: "downtown".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "feed 'downtown' returned HTTP 503");

        let err = FetchError::Parse {
            feed: "downtown".to_string(),
            error: ParseError::InvalidJson("expected value".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "feed 'downtown' returned an unreadable body: invalid JSON: expected value"
        );
    }

    #[test]
    fn notify_error_display() {
        let err = NotifyError::Rejected { status: 400 };
        assert_eq!(
            err.to_string(),
            "webhook rejected notification with HTTP 400"
        );

        let err = NotifyError::SendFailed("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "failed to send notification: connection refused"
        );
    }

    #[test]
    fn poll_error_wraps_fetch_error() {
        let err: PollError = FetchError::NoSources.into();
        assert_eq!(err.to_string(), "fetch error: no sources configured");
    }
}
