//! Notification delivery.
//!
//! The engine hands every [`NotificationMessage`](crate::message::NotificationMessage)
//! to a [`Notifier`]. The only channel shipped is the HTTP webhook, which
//! posts an Office 365 connector card by default.

mod traits;
pub mod webhook;

pub use traits::Notifier;
pub use webhook::{MessageCard, WebhookNotifier};
