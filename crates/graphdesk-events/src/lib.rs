use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use graphdesk_core::{Axis, ElementId, NodeId, Vec2};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Selection
    SelectionChanged {
        selected: Vec<ElementId>,
    },

    // Graph structure
    ElementsAdded {
        ids: Vec<ElementId>,
    },
    ElementsRemoved {
        ids: Vec<ElementId>,
    },
    NodesMoved {
        moves: Vec<(NodeId, Vec2)>,
    },

    // Visibility
    ElementsHidden {
        ids: Vec<ElementId>,
    },
    ElementsShown {
        ids: Vec<ElementId>,
    },
    BorderThickened {
        nodes: Vec<NodeId>,
    },
    BorderThinned {
        nodes: Vec<NodeId>,
    },

    // ========================================================================
    // Undo/Redo Events
    // ========================================================================
    ActionDone {
        name: String,
    },
    BeforeUndo {
        name: String,
    },
    AfterUndo {
        name: String,
    },
    BeforeRedo {
        name: String,
    },
    AfterRedo {
        name: String,
    },
    UndoStackChanged {
        can_undo: bool,
        can_redo: bool,
        undo_description: Option<String>,
        redo_description: Option<String>,
    },

    // ========================================================================
    // Snap Events
    // ========================================================================
    SnapOffered {
        node: NodeId,
        axis: Axis,
        offset: f32,
    },
    NodeSnapped {
        node: NodeId,
        offset: Vec2,
    },

    // Detail panel
    PanelRetargeted {
        target: ElementId,
    },

    // Notifications
    ShowWarning {
        message: String,
    },
}

/// Coarse channel a subscriber can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    All,
    Selection,
    Structure,
    Visibility,
    History,
    Snap,
    Panel,
    Notification,
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::SelectionChanged { .. } => Topic::Selection,
            Event::ElementsAdded { .. } | Event::ElementsRemoved { .. } | Event::NodesMoved { .. } => {
                Topic::Structure
            }
            Event::ElementsHidden { .. }
            | Event::ElementsShown { .. }
            | Event::BorderThickened { .. }
            | Event::BorderThinned { .. } => Topic::Visibility,
            Event::ActionDone { .. }
            | Event::BeforeUndo { .. }
            | Event::AfterUndo { .. }
            | Event::BeforeRedo { .. }
            | Event::AfterRedo { .. }
            | Event::UndoStackChanged { .. } => Topic::History,
            Event::SnapOffered { .. } | Event::NodeSnapped { .. } => Topic::Snap,
            Event::PanelRetargeted { .. } => Topic::Panel,
            Event::ShowWarning { .. } => Topic::Notification,
        }
    }
}

impl Topic {
    fn accepts(self, event: &Event) -> bool {
        self == Topic::All || self == event.topic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live subscription. Dropping the receiver detaches it on the next publish.
pub struct Subscription {
    pub id: SubscriptionId,
    pub topic: Topic,
    pub receiver: Receiver<Event>,
}

/// Registry entry visible through [`EventBus::subscriptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub topic: Topic,
    pub label: String,
}

struct Subscriber {
    info: SubscriptionInfo,
    tx: Sender<Event>,
}

/// Events kept on the shared queue before the oldest are dropped.
pub const SHARED_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = bounded(SHARED_QUEUE_CAPACITY);
        Self {
            tx,
            rx,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    /// Send an event to the shared queue and every matching subscriber.
    pub fn publish(&self, event: Event) {
        {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|sub| {
                if !sub.info.topic.accepts(&event) {
                    return true;
                }
                let delivered = sub.tx.send(event.clone()).is_ok();
                if !delivered {
                    tracing::debug!(
                        "Dropping disconnected subscription {} ({})",
                        sub.info.id,
                        sub.info.label
                    );
                }
                delivered
            });
        }
        // When the shared queue is full the oldest event makes room.
        if let Err(TrySendError::Full(event)) = self.tx.try_send(event) {
            let _ = self.rx.try_recv();
            if self.tx.try_send(event).is_err() {
                tracing::debug!("Shared event queue full, event dropped");
            }
        }
    }

    /// Events waiting on the shared queue.
    pub fn queued_len(&self) -> usize {
        self.rx.len()
    }

    /// Register a subscriber for one topic.
    pub fn subscribe(&self, topic: Topic, label: impl Into<String>) -> Subscription {
        let (tx, receiver) = unbounded();
        let id = SubscriptionId(Uuid::new_v4());
        let info = SubscriptionInfo {
            id,
            topic,
            label: label.into(),
        };
        tracing::debug!("Subscribed {} to {:?} as {}", info.label, topic, id);
        self.subscribers.lock().push(Subscriber { info, tx });
        Subscription {
            id,
            topic,
            receiver,
        }
    }

    /// Remove a subscription. Returns false when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|sub| sub.info.id != id);
        before != subscribers.len()
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionInfo> {
        self.subscribers
            .lock()
            .iter()
            .map(|sub| sub.info.clone())
            .collect()
    }

    /// Tear down every subscription at once.
    pub fn clear_subscriptions(&self) {
        self.subscribers.lock().clear();
    }

    /// Dispatch all pending events on the shared queue to a listener.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }

    /// Take everything waiting on the shared queue.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }
}

/// Trait for components that respond to events.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphdesk_core::NodeId;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let receiver = bus.receiver();

        bus.publish(Event::SelectionChanged {
            selected: vec![ElementId::Node(NodeId(123))],
        });

        match receiver.recv().unwrap() {
            Event::SelectionChanged { selected } => {
                assert_eq!(selected, vec![ElementId::Node(NodeId(123))]);
            }
            _ => panic!("Expected SelectionChanged event"),
        }
    }

    #[test]
    fn test_topic_filtering() {
        let bus = EventBus::new();
        let history = bus.subscribe(Topic::History, "history");
        let all = bus.subscribe(Topic::All, "all");

        bus.publish(Event::ActionDone {
            name: "move".to_string(),
        });
        bus.publish(Event::ElementsHidden { ids: vec![] });

        assert_eq!(history.receiver.try_iter().count(), 1);
        assert_eq!(all.receiver.try_iter().count(), 2);
    }

    #[test]
    fn test_subscriptions_can_be_listed_and_removed() {
        let bus = EventBus::new();
        let a = bus.subscribe(Topic::Snap, "guides");
        let _b = bus.subscribe(Topic::Panel, "panel");

        let listed = bus.subscriptions();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|s| s.id == a.id && s.label == "guides"));

        assert!(bus.unsubscribe(a.id));
        assert!(!bus.unsubscribe(a.id));
        assert_eq!(bus.subscriptions().len(), 1);

        bus.publish(Event::SnapOffered {
            node: NodeId(1),
            axis: Axis::X,
            offset: 2.0,
        });
        assert!(a.receiver.try_recv().is_err());

        bus.clear_subscriptions();
        assert!(bus.subscriptions().is_empty());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let bus = EventBus::new();
        let sub = bus.subscribe(Topic::All, "temporary");
        drop(sub);

        bus.publish(Event::ShowWarning {
            message: "x".to_string(),
        });
        assert!(bus.subscriptions().is_empty());
    }

    struct Counter(usize);

    impl EventListener for Counter {
        fn handle_event(&mut self, _event: &Event) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_dispatch_to_listener() {
        let bus = EventBus::new();
        bus.publish(Event::ElementsShown { ids: vec![] });
        bus.publish(Event::ElementsShown { ids: vec![] });

        let mut counter = Counter(0);
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 2);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_event_serializes() {
        let json = serde_json::to_string(&Event::BorderThickened {
            nodes: vec![NodeId(2)],
        })
        .unwrap();
        assert!(json.contains("BorderThickened"));
    }

    #[test]
    fn test_shared_queue_keeps_newest_when_full() {
        let bus = EventBus::new();
        for i in 0..(SHARED_QUEUE_CAPACITY + 10) {
            bus.publish(Event::ActionDone {
                name: i.to_string(),
            });
        }
        assert_eq!(bus.queued_len(), SHARED_QUEUE_CAPACITY);

        let events = bus.drain();
        assert_eq!(
            events.first(),
            Some(&Event::ActionDone {
                name: "10".to_string()
            })
        );
        assert_eq!(
            events.last(),
            Some(&Event::ActionDone {
                name: (SHARED_QUEUE_CAPACITY + 9).to_string()
            })
        );
        assert_eq!(bus.queued_len(), 0);
    }
}
