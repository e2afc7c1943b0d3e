use serde_derive::Serialize;
use tokio::sync::broadcast;

use crate::validation::message::ValidationMessage;

/// Emitted after a field's messages change.
///
/// `messages` is the complete current list for `field`, not a delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationChangedEvent {
    pub field: String,
    pub messages: Vec<ValidationMessage>,
}

impl ValidationChangedEvent {
    pub fn new(field: impl Into<String>, messages: Vec<ValidationMessage>) -> Self {
        Self {
            field: field.into(),
            messages,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Fans validation events out to any number of channel subscribers.
///
/// Sending never blocks and needs no runtime; events sent while nobody is subscribed
/// are dropped. Slow receivers observe `RecvError::Lagged` once `capacity` events
/// pile up.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ValidationChangedEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per receiver.
    ///
    /// A capacity of zero is raised to one, since the underlying channel rejects it.
    ///
    /// # Examples
    ///
    /// ```
    /// use validatable::validation::events::{EventBroadcaster, ValidationChangedEvent};
    ///
    /// let broadcaster = EventBroadcaster::new(0);
    /// let mut receiver = broadcaster.subscribe();
    /// broadcaster.send(ValidationChangedEvent::new("Email", vec![]));
    /// assert!(receiver.try_recv().is_ok());
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        EventBroadcaster { sender }
    }

    pub fn send(&self, event: ValidationChangedEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ValidationChangedEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
