use domain::ScanEvent;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Stream of scan events handed to the current subscriber
pub type EventStream = mpsc::UnboundedReceiver<ScanEvent>;

/// Single-subscriber publish point for scan events.
///
/// Events published with no live subscriber are dropped: the decoder never
/// waits for someone to listen.
#[derive(Debug, Default)]
pub struct EventBridge {
    subscriber: Option<mpsc::UnboundedSender<ScanEvent>>,
    delivered: u64,
    dropped: u64,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current subscriber. The previous stream ends.
    pub fn subscribe(&mut self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.subscriber.replace(tx).is_some() {
            debug!("Replaced previous event subscriber");
        }
        rx
    }

    pub fn unsubscribe(&mut self) {
        if self.subscriber.take().is_some() {
            debug!("Event subscriber removed");
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver to the current subscriber. Returns whether it was delivered.
    pub fn publish(&mut self, event: ScanEvent) -> bool {
        if let Some(tx) = &self.subscriber {
            if tx.send(event).is_ok() {
                self.delivered += 1;
                return true;
            }
            debug!("Event subscriber is gone, clearing it");
            self.subscriber = None;
        } else {
            trace!("No event subscriber, dropping scan event");
        }

        self.dropped += 1;
        false
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> ScanEvent {
        ScanEvent::new(text.as_bytes().to_vec())
    }

    #[test]
    fn test_publish_without_subscriber_drops() {
        let mut bridge = EventBridge::new();
        assert!(!bridge.publish(event("4006381333931")));
        assert_eq!(bridge.dropped(), 1);
        assert_eq!(bridge.delivered(), 0);
    }

    #[tokio::test]
    async fn test_publish_delivers_in_order() {
        let mut bridge = EventBridge::new();
        let mut stream = bridge.subscribe();

        assert!(bridge.publish(event("A")));
        assert!(bridge.publish(event("B")));

        assert_eq!(stream.recv().await.unwrap().text(), "A");
        assert_eq!(stream.recv().await.unwrap().text(), "B");
    }

    #[tokio::test]
    async fn test_subscribe_replaces_previous_subscriber() {
        let mut bridge = EventBridge::new();
        let mut first = bridge.subscribe();
        let mut second = bridge.subscribe();

        bridge.publish(event("only-second"));

        assert!(first.recv().await.is_none(), "old stream must end");
        assert_eq!(second.recv().await.unwrap().text(), "only-second");
    }

    #[test]
    fn test_dropped_subscriber_is_cleared() {
        let mut bridge = EventBridge::new();
        let stream = bridge.subscribe();
        drop(stream);

        assert!(!bridge.has_subscriber());
        assert!(!bridge.publish(event("X")));
        assert_eq!(bridge.dropped(), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_ends_stream() {
        let mut bridge = EventBridge::new();
        let mut stream = bridge.subscribe();
        bridge.unsubscribe();

        assert!(!bridge.publish(event("late")));
        assert!(stream.recv().await.is_none());
    }
}
