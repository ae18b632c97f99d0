//! Typed in-process publish/subscribe used to fan reconciled state out to
//! view components. Single-threaded: handlers run to completion inside
//! [`EventBus::publish`].

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::models::{Notification, Post, PostId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PostCreated,
    PostUpdated,
    PostDeleted,
    NotificationReceived,
    PresenceChanged,
    ConnectionChanged,
    MessageReceived,
    MessageNotification,
    UserTyping,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    PostCreated(Post),
    /// The post as it stands after the change.
    PostUpdated(Post),
    PostDeleted(PostId),
    NotificationReceived(Notification),
    PresenceChanged { user_id: UserId, online: bool },
    ConnectionChanged(bool),
    MessageReceived(Value),
    MessageNotification(Value),
    UserTyping(Value),
}

impl BusEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BusEvent::PostCreated(_) => EventKind::PostCreated,
            BusEvent::PostUpdated(_) => EventKind::PostUpdated,
            BusEvent::PostDeleted(_) => EventKind::PostDeleted,
            BusEvent::NotificationReceived(_) => EventKind::NotificationReceived,
            BusEvent::PresenceChanged { .. } => EventKind::PresenceChanged,
            BusEvent::ConnectionChanged(_) => EventKind::ConnectionChanged,
            BusEvent::MessageReceived(_) => EventKind::MessageReceived,
            BusEvent::MessageNotification(_) => EventKind::MessageNotification,
            BusEvent::UserTyping(_) => EventKind::UserTyping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

type Handler = Box<dyn FnMut(&BusEvent)>;

struct Subscription {
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_token: u64,
    subscriptions: BTreeMap<SubscriptionToken, Subscription>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: FnMut(&BusEvent) + 'static,
    {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.insert(
            token,
            Subscription {
                kind,
                handler: Box::new(handler),
            },
        );
        token
    }

    /// Returns false when the token was unknown or already removed.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.subscriptions.remove(&token).is_some()
    }

    /// Deliver to every handler of the event's kind, in subscription order.
    pub fn publish(&mut self, event: &BusEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for subscription in self.subscriptions.values_mut() {
            if subscription.kind == kind {
                (subscription.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions.values().filter(|s| s.kind == kind).count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
