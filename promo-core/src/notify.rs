use promo_shared::OfferEvent;
use tokio::sync::broadcast;

/// Thin pub/sub relay for offer changes. Publishing never blocks and having
/// no subscribers is fine; slow subscribers drop the oldest events.
#[derive(Clone, Debug)]
pub struct OfferNotifier {
    tx: broadcast::Sender<OfferEvent>,
}

impl OfferNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: OfferEvent) {
        let kind = event.kind();
        let offer_id = event.offer_id();
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!(kind, %offer_id, receivers, "offer event published"),
            Err(_) => tracing::trace!(kind, %offer_id, "offer event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OfferEvent> {
        self.tx.subscribe()
    }
}

impl Default for OfferNotifier {
    fn default() -> Self {
        Self::new(100)
    }
}
