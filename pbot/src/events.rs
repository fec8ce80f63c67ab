//! Domain events and per-scope listener lists.
//!
//! Bot-level events are [`BotEvent`]; rooms and contacts carry their own scoped lists
//! ([`RoomEvent`], [`ContactEvent`]). Listeners are plain synchronous callbacks invoked in
//! registration order; spawn a task inside the callback for async work.

use chrono::{DateTime, Utc};
use pbot_core::ScanStatus;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::entity::{Contact, Friendship, Message, Room, RoomInvitation};
use crate::error::BotError;

/// Event emitted at bot scope.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Dong {
        data: Option<String>,
    },
    Error(BotError),
    Heartbeat {
        data: String,
    },
    Friendship(Arc<Friendship>),
    Login(Arc<Contact>),
    Logout {
        contact: Arc<Contact>,
        reason: Option<String>,
    },
    Message(Arc<Message>),
    Ready,
    RoomInvite(Arc<RoomInvitation>),
    RoomJoin {
        room: Arc<Room>,
        invitees: Vec<Arc<Contact>>,
        inviter: Arc<Contact>,
        date: DateTime<Utc>,
    },
    RoomLeave {
        room: Arc<Room>,
        leavers: Vec<Arc<Contact>>,
        remover: Arc<Contact>,
        date: DateTime<Utc>,
    },
    RoomTopic {
        room: Arc<Room>,
        new_topic: String,
        old_topic: String,
        changer: Arc<Contact>,
        date: DateTime<Utc>,
    },
    Scan {
        qrcode: Option<String>,
        status: ScanStatus,
        data: Option<String>,
    },
    Start,
    Stop,
}

impl BotEvent {
    /// Event name, e.g. `room-join`.
    pub fn name(&self) -> &'static str {
        match self {
            BotEvent::Dong { .. } => "dong",
            BotEvent::Error(_) => "error",
            BotEvent::Heartbeat { .. } => "heartbeat",
            BotEvent::Friendship(_) => "friendship",
            BotEvent::Login(_) => "login",
            BotEvent::Logout { .. } => "logout",
            BotEvent::Message(_) => "message",
            BotEvent::Ready => "ready",
            BotEvent::RoomInvite(_) => "room-invite",
            BotEvent::RoomJoin { .. } => "room-join",
            BotEvent::RoomLeave { .. } => "room-leave",
            BotEvent::RoomTopic { .. } => "room-topic",
            BotEvent::Scan { .. } => "scan",
            BotEvent::Start => "start",
            BotEvent::Stop => "stop",
        }
    }
}

/// Event emitted at room scope.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Message(Arc<Message>),
    Join {
        invitees: Vec<Arc<Contact>>,
        inviter: Arc<Contact>,
        date: DateTime<Utc>,
    },
    Leave {
        leavers: Vec<Arc<Contact>>,
        remover: Arc<Contact>,
        date: DateTime<Utc>,
    },
    Topic {
        new_topic: String,
        old_topic: String,
        changer: Arc<Contact>,
        date: DateTime<Utc>,
    },
}

/// Event emitted at contact scope.
#[derive(Debug, Clone)]
pub enum ContactEvent {
    Friendship(Arc<Friendship>),
}

/// Event type for entity kinds that have no scoped events.
#[derive(Debug, Clone)]
pub enum NoEvent {}

/// Returns `false` once it should be dropped from the list.
type Listener<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Ordered list of callbacks for one event scope.
pub struct Listeners<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }
}

impl<E: 'static> Listeners<E> {
    pub fn add(&self, listener: impl Fn(&E) + Send + Sync + 'static) {
        self.push(Arc::new(move |event: &E| {
            listener(event);
            true
        }));
    }

    fn push(&self, listener: Listener<E>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Calls every listener in registration order. The list is snapshotted first so a listener
    /// may register further listeners without deadlocking. Listeners that report themselves
    /// closed are removed afterwards.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let closed: Vec<Listener<E>> = snapshot
            .into_iter()
            .filter(|listener| !listener(event))
            .collect();
        if !closed.is_empty() {
            self.listeners
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|l| !closed.iter().any(|c| Arc::ptr_eq(l, c)));
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Clone + Send + 'static> Listeners<E> {
    /// Registers a listener that forwards every event into a channel. It is dropped on the
    /// first emit after the receiver goes away.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Arc::new(move |event: &E| tx.send(event.clone()).is_ok()));
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listeners_run_in_registration_order() {
        let listeners: Listeners<u32> = Listeners::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        listeners.add(move |n| o.lock().unwrap().push(format!("first:{}", n)));
        let o = order.clone();
        listeners.add(move |n| o.lock().unwrap().push(format!("second:{}", n)));

        listeners.emit(&7);
        assert_eq!(*order.lock().unwrap(), vec!["first:7", "second:7"]);
    }

    #[tokio::test]
    async fn test_subscribe_forwards_events() {
        let listeners: Listeners<String> = Listeners::default();
        let mut rx = listeners.subscribe();
        listeners.emit(&"hello".to_string());
        assert_eq!(rx.recv().await.unwrap(), "hello");
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned_on_emit() {
        let listeners: Listeners<u32> = Listeners::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        listeners.add(move |n| s.lock().unwrap().push(*n));
        for _ in 0..1000 {
            drop(listeners.subscribe());
        }
        let mut live = listeners.subscribe();
        assert_eq!(listeners.len(), 1002);

        listeners.emit(&1);

        assert_eq!(listeners.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(live.try_recv().unwrap(), 1);
    }
}
