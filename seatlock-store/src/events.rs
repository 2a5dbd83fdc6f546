use seatlock_shared::SeatEvent;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// In-process publisher for seat transitions. Subscribers that fall behind
/// lose the oldest events; publishing never blocks or fails the caller.
#[derive(Clone)]
pub struct EventProducer {
    tx: broadcast::Sender<SeatEvent>,
}

impl EventProducer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: SeatEvent) {
        let kind = event.kind.as_str();
        let label = event.label.clone();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {} for seat {} to {} subscriber(s)", kind, label, receivers),
            Err(_) => trace!("No subscribers for {} on seat {}", kind, label),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeatEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventProducer {
    fn default() -> Self {
        Self::new(100)
    }
}
