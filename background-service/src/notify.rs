use notify_rust::Notification;
use tracing::debug;

/// Receives one summary per finished poll cycle.
pub trait CycleNotifier: Send + Sync {
    fn notify(&self, summary: &str, body: &str);
}

/// Best effort: platforms without a notification daemon only get a debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl CycleNotifier for DesktopNotifier {
    fn notify(&self, summary: &str, body: &str) {
        if let Err(e) = Notification::new()
            .appname("gfy_mirror")
            .summary(summary)
            .body(body)
            .show()
        {
            debug!("Desktop notification unavailable: {}", e);
        }
    }
}
