use tokio::sync::mpsc;

use crate::domain::models::Notification;
use crate::domain::models::NotificationLevel;

/// Fan-out point for user facing notices. Without a sender attached the
/// notices only reach the log.
#[derive(Clone, Default)]
pub struct Notifier {
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl Notifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Notifier {
        return Notifier { tx: Some(tx) };
    }

    pub fn info(&self, text: &str) {
        self.notify(NotificationLevel::Info, text);
    }

    pub fn success(&self, text: &str) {
        self.notify(NotificationLevel::Success, text);
    }

    pub fn error(&self, text: &str) {
        self.notify(NotificationLevel::Error, text);
    }

    fn notify(&self, level: NotificationLevel, text: &str) {
        tracing::debug!(level = %level, text, "notification");
        if let Some(tx) = &self.tx {
            if tx.send(Notification::new(level, text)).is_err() {
                tracing::debug!("Notification receiver dropped");
            }
        }
    }
}
