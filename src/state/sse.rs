use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Fan-out point for the best-effort change feed.
///
/// Polling stays authoritative: a subscriber that lags simply misses events.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Number of connected listeners.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish `event`; dropped silently when nobody listens.
    pub fn broadcast(&self, event: ServerEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            trace!(event = ?event.event, "no change-feed subscribers");
        }
    }
}
