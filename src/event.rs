use std::time::Duration;

use tokio::sync::mpsc;

/// Emitted just before the engine waits out a retry delay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryEvent {
    /// 1-based index of the retry about to happen.
    pub attempt: u32,
    /// Retry budget of the active policy.
    pub max_retries: u32,
    /// Wait before the retry is sent.
    pub delay: Duration,
    /// Status of the response that triggered the retry.
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub status_text: String,
}

/// Receives retry notifications.
pub trait RetryListener: Send + Sync {
    fn on_retry(&self, event: &RetryEvent);
}

impl<F> RetryListener for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn on_retry(&self, event: &RetryEvent) {
        self(event)
    }
}

/// Forwards events to a channel; a closed receiver is ignored.
impl RetryListener for mpsc::UnboundedSender<RetryEvent> {
    fn on_retry(&self, event: &RetryEvent) {
        let _ = self.send(event.clone());
    }
}
