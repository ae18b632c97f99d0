//! Keeps the locally held timeline, notifications and presence set in step
//! with pushed change events, without re-fetching.
//!
//! All mutation of the post collection goes through here. Absent targets are
//! no-ops; the only fallible operation is the optimistic like toggle, whose
//! failure restores the snapshot taken before the speculative change.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::controllers::event_bus::{BusEvent, EventBus, EventKind, SubscriptionToken};
use crate::error::ConnectuiError;
use crate::models::{
    InboundEvent, LikeOutcome, Notification, Post, PostId, PostPatch, SocialApi, TransportSignal,
    UserId,
};

/// How long a post from someone else counts towards the "new posts" banner.
pub const NEW_POST_NOTICE: Duration = Duration::from_secs(5);

/// Pre-toggle state of a post, taken by [`Reconciler::begin_like`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeTicket {
    pub post_id: PostId,
    prior_liked: bool,
    prior_likes: u64,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    viewer_id: Option<UserId>,
    /// Newest first.
    posts: Vec<Post>,
    notifications: Vec<Notification>,
    unread_notifications: usize,
    online: HashSet<UserId>,
    connected: bool,
    new_posts: usize,
    new_post_deadlines: VecDeque<Instant>,
    bus: EventBus,
}

impl Reconciler {
    pub fn new(viewer_id: Option<UserId>) -> Self {
        Self {
            viewer_id,
            ..Self::default()
        }
    }

    pub fn viewer_id(&self) -> Option<UserId> {
        self.viewer_id
    }

    pub fn set_viewer(&mut self, viewer_id: Option<UserId>) {
        self.viewer_id = viewer_id;
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_notifications(&self) -> usize {
        self.unread_notifications
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.online.contains(&user_id)
    }

    pub fn online_users(&self) -> &HashSet<UserId> {
        &self.online
    }

    pub fn new_posts_count(&self) -> usize {
        self.new_posts
    }

    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: FnMut(&BusEvent) + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.bus.unsubscribe(token)
    }

    /// Load a fetched timeline, newest first.
    pub fn replace_posts(&mut self, mut posts: Vec<Post>) {
        posts.sort_by_key(|post| std::cmp::Reverse(post.created_at));
        self.posts = posts;
    }

    pub fn replace_notifications(&mut self, notifications: Vec<Notification>, unread: usize) {
        self.notifications = notifications;
        self.unread_notifications = unread;
    }

    pub fn on_create(&mut self, post: Post, now: Instant) {
        let from_viewer = self.viewer_id.is_some() && post.author_id() == self.viewer_id;
        self.posts.insert(0, post.clone());

        if !from_viewer {
            self.new_posts += 1;
            self.new_post_deadlines.push_back(now + NEW_POST_NOTICE);
        }
        self.bus.publish(&BusEvent::PostCreated(post));
    }

    /// Returns whether a cached post matched the patch.
    pub fn on_update(&mut self, patch: &PostPatch) -> bool {
        let Some(post) = self.post_mut(patch.id) else {
            log::debug!("dropping update for uncached post {}", patch.id);
            return false;
        };
        post.merge(patch);
        let updated = post.clone();
        self.bus.publish(&BusEvent::PostUpdated(updated));
        true
    }

    /// Returns whether a post was removed.
    pub fn on_delete(&mut self, post_id: PostId) -> bool {
        let Some(index) = self.posts.iter().position(|p| p.id == post_id) else {
            return false;
        };
        self.posts.remove(index);
        self.bus.publish(&BusEvent::PostDeleted(post_id));
        true
    }

    pub fn on_notification(&mut self, notification: Notification) {
        self.notifications.insert(0, notification.clone());
        if !notification.is_read {
            self.unread_notifications += 1;
        }
        self.bus.publish(&BusEvent::NotificationReceived(notification));
    }

    pub fn mark_notifications_seen(&mut self) {
        self.unread_notifications = 0;
        for notification in &mut self.notifications {
            notification.is_read = true;
        }
    }

    /// Returns whether membership changed.
    pub fn on_presence(&mut self, user_id: UserId, online: bool) -> bool {
        let changed = if online {
            self.online.insert(user_id)
        } else {
            self.online.remove(&user_id)
        };
        if changed {
            self.bus.publish(&BusEvent::PresenceChanged { user_id, online });
        }
        changed
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            self.bus.publish(&BusEvent::ConnectionChanged(connected));
        }
    }

    /// Drop new-post notices whose five seconds are up.
    pub fn expire_new_posts(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        while self.new_post_deadlines.front().is_some_and(|deadline| *deadline <= now) {
            self.new_post_deadlines.pop_front();
            self.new_posts = self.new_posts.saturating_sub(1);
            expired += 1;
        }
        expired
    }

    pub fn dismiss_new_posts(&mut self) {
        self.new_posts = 0;
        self.new_post_deadlines.clear();
    }

    /// Phase one of the optimistic like: snapshot, then flip locally.
    pub fn begin_like(&mut self, post_id: PostId) -> Option<LikeTicket> {
        let post = self.post_mut(post_id)?;
        let ticket = LikeTicket {
            post_id,
            prior_liked: post.is_liked,
            prior_likes: post.likes_count,
        };

        post.is_liked = !ticket.prior_liked;
        post.likes_count = if ticket.prior_liked {
            ticket.prior_likes.saturating_sub(1)
        } else {
            ticket.prior_likes + 1
        };
        let updated = post.clone();
        self.bus.publish(&BusEvent::PostUpdated(updated));
        Some(ticket)
    }

    /// Phase two: adopt the server's answer, or restore the snapshot
    /// exactly. Returns whether the toggle stuck.
    pub fn settle_like(
        &mut self,
        ticket: LikeTicket,
        outcome: Result<LikeOutcome, ConnectuiError>,
    ) -> bool {
        let confirmed = outcome.is_ok();
        let Some(post) = self.post_mut(ticket.post_id) else {
            return confirmed;
        };

        match outcome {
            Ok(server) => {
                post.is_liked = server.is_liked;
                post.likes_count = server.likes_count;
            }
            Err(e) => {
                log::warn!("like toggle for post {} failed, reverting: {}", ticket.post_id, e);
                post.is_liked = ticket.prior_liked;
                post.likes_count = ticket.prior_likes;
            }
        }
        let updated = post.clone();
        self.bus.publish(&BusEvent::PostUpdated(updated));
        confirmed
    }

    /// Both like phases around a single request. Unknown ids do nothing.
    pub async fn toggle_like<A>(&mut self, api: &A, post_id: PostId) -> bool
    where
        A: SocialApi + ?Sized,
    {
        let Some(ticket) = self.begin_like(post_id) else {
            return false;
        };
        let outcome = api.toggle_like(post_id).await;
        self.settle_like(ticket, outcome)
    }

    pub fn apply(&mut self, event: InboundEvent, now: Instant) {
        match event {
            InboundEvent::Hello { message } => log::info!("push greeting: {}", message),
            InboundEvent::NewPost(post) => {
                // Our own submissions come back over the push channel too.
                if self.post(post.id).is_some() {
                    self.on_update(&PostPatch::from(post));
                } else {
                    self.on_create(post, now);
                }
            }
            InboundEvent::PostUpdated(patch) => {
                self.on_update(&patch);
            }
            InboundEvent::PostDeleted(post_id) => {
                self.on_delete(post_id);
            }
            InboundEvent::UserOnline(user_id) => {
                self.on_presence(user_id, true);
            }
            InboundEvent::UserOffline(user_id) => {
                self.on_presence(user_id, false);
            }
            InboundEvent::NewNotification(notification) => self.on_notification(notification),
            InboundEvent::NewMessage(payload) => {
                self.bus.publish(&BusEvent::MessageReceived(payload));
            }
            InboundEvent::MessageNotification(payload) => {
                self.bus.publish(&BusEvent::MessageNotification(payload));
            }
            InboundEvent::UserTyping(payload) => {
                self.bus.publish(&BusEvent::UserTyping(payload));
            }
            InboundEvent::ServerError { message } => log::warn!("push server error: {}", message),
        }
    }

    pub fn apply_signal(&mut self, signal: TransportSignal, now: Instant) {
        match signal {
            TransportSignal::Connected => self.set_connected(true),
            TransportSignal::Disconnected => self.set_connected(false),
            TransportSignal::Event(event) => self.apply(event, now),
        }
    }

    /// Forget everything held for the session. Subscriptions survive.
    pub fn clear(&mut self) {
        self.viewer_id = None;
        self.posts.clear();
        self.notifications.clear();
        self.unread_notifications = 0;
        self.online.clear();
        self.set_connected(false);
        self.dismiss_new_posts();
    }
}
