//! Notification dispatch boundary
//!
//! The sweep decides *when* a reminder fires; a [`Notify`] implementation
//! decides *how* it is surfaced. Dispatch is fire-and-forget: a failure to
//! display never rolls back a latch or blocks persistence.

use serde::Serialize;

use crate::store::Stage;

/// Title shown on every reminder.
pub const NOTIFICATION_TITLE: &str = "Event Reminder";

/// A fired reminder, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event_name: String,
    /// Countdown text at the moment of firing.
    pub remaining: String,
    pub stage: Stage,
}

impl Notification {
    /// Body text: the event name with its countdown, or the NOW literal
    /// once the event is due.
    pub fn body(&self) -> String {
        match self.stage {
            Stage::Now => format!(" {}  NOW", self.event_name),
            _ => format!(" {} in {}", self.event_name, self.remaining),
        }
    }
}

/// Dispatcher for fired reminders.
pub trait Notify: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Dispatcher that writes reminders to the log. Stands in for a desktop
/// toast when no display layer is attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn notify(&self, notification: &Notification) {
        tracing::info!(
            stage = notification.stage.label(),
            "{}:{}",
            NOTIFICATION_TITLE,
            notification.body()
        );
    }
}
