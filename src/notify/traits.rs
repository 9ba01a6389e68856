//! Notifier trait definition.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::message::NotificationMessage;

/// A delivery channel for notification messages.
///
/// Implementations make a single delivery attempt per call; the caller
/// decides what to do with a failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name of this notifier instance, used in logs and metric labels.
    fn name(&self) -> &str;

    /// Kind of channel (e.g. "webhook").
    fn notifier_type(&self) -> &str;

    /// Deliver one message.
    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

impl std::fmt::Debug for dyn Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("name", &self.name())
            .field("type", &self.notifier_type())
            .finish()
    }
}
