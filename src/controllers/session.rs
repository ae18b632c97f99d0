//! Per-login context handed to every front-end component: REST client,
//! viewer profile, translator, reconciler and the push connection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::controllers::post_controller;
use crate::controllers::reconciler::{LikeTicket, Reconciler};
use crate::error::ConnectuiError;
use crate::i18n::{select_locale, LocaleCatalog, Translator};
use crate::models::{
    Credentials, LikeOutcome, OutboundCommand, Post, PostId, PostPatch, PushConnection, SocialApi, User,
    UserId,
};

pub struct Session {
    api: Arc<dyn SocialApi>,
    user: Option<User>,
    translator: Translator,
    reconciler: Reconciler,
    push: Option<PushConnection>,
    runtime_locale: Option<String>,
    locale_override: Option<String>,
}

impl Session {
    pub fn new(
        api: Arc<dyn SocialApi>,
        catalog: Arc<LocaleCatalog>,
        runtime_locale: Option<String>,
        locale_override: Option<String>,
    ) -> Self {
        let locale_override = locale_override.filter(|l| !l.trim().is_empty());
        let mut session = Self {
            api,
            user: None,
            translator: Translator::new(Arc::clone(&catalog), catalog.default_locale()),
            reconciler: Reconciler::new(None),
            push: None,
            runtime_locale,
            locale_override,
        };
        session.refresh_locale();
        session
    }

    pub fn api(&self) -> Arc<dyn SocialApi> {
        Arc::clone(&self.api)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    fn refresh_locale(&mut self) {
        let locale = match &self.locale_override {
            Some(forced) => forced.clone(),
            None => select_locale(
                self.user.as_ref().and_then(User::preferred_locale),
                self.runtime_locale.as_deref(),
                self.translator.catalog(),
            ),
        };
        self.translator.set_locale(&locale);
    }

    fn set_user(&mut self, user: Option<User>) {
        self.reconciler.set_viewer(user.as_ref().map(|u| u.id));
        self.user = user;
        self.refresh_locale();
    }

    fn viewer_id(&self) -> Result<UserId, ConnectuiError> {
        self.user
            .as_ref()
            .map(|u| u.id)
            .ok_or(ConnectuiError::NotAuthenticated)
    }

    /// Restore the session from the server's cookie. `Ok(None)` when the
    /// server says we are not logged in.
    pub async fn authenticate(&mut self) -> Result<Option<&User>, ConnectuiError> {
        match self.api.current_user().await {
            Ok(user) => {
                log::info!("authenticated as @{}", user.handle);
                self.set_user(Some(user));
            }
            Err(e) if e.is_unauthorized() => {
                log::info!("no active session");
                self.set_user(None);
            }
            Err(e) => return Err(e),
        }
        Ok(self.user.as_ref())
    }

    pub async fn login(&mut self, credentials: &Credentials) -> Result<&User, ConnectuiError> {
        let user = self.api.login(credentials).await?;
        log::info!("logged in as @{}", user.handle);
        if let Err(e) = self.api.persist_session() {
            log::warn!("could not save the session: {}", e);
        }
        self.set_user(Some(user));
        Ok(self.user.as_ref().ok_or(ConnectuiError::NotAuthenticated)?)
    }

    /// Tear the session down: push first, so nothing more is dispatched,
    /// then local state, then the server session (best effort).
    pub async fn logout(&mut self) {
        self.close_push();
        self.reconciler.clear();

        if self.user.is_some() {
            if let Err(e) = self.api.logout().await {
                log::warn!("server logout failed, clearing local session anyway: {}", e);
            }
        }
        if let Err(e) = self.api.forget_session() {
            log::warn!("could not remove the saved session: {}", e);
        }
        self.set_user(None);
    }

    /// End a restored session, if there is one. Never logs in just to log
    /// out. Returns whether a session was ended.
    pub async fn sign_out(&mut self) -> Result<bool, ConnectuiError> {
        if self.authenticate().await?.is_none() {
            log::info!("nothing to log out of");
            return Ok(false);
        }
        self.logout().await;
        Ok(true)
    }

    pub fn attach_push(&mut self, connection: PushConnection) {
        self.close_push();
        self.push = Some(connection);
    }

    /// Open the push socket, forwarding the REST session cookie.
    pub fn connect_push(&mut self, url: &str, reconnect_delay: Duration) {
        let connection = PushConnection::spawn(url.to_string(), self.api.session_cookie(), reconnect_delay);
        self.attach_push(connection);
    }

    pub fn close_push(&mut self) {
        if let Some(connection) = self.push.take() {
            connection.close();
        }
        self.reconciler.set_connected(false);
    }

    pub fn is_push_attached(&self) -> bool {
        self.push.is_some()
    }

    /// Apply every pending push signal in arrival order, then expire
    /// new-post notices. Returns the number of signals applied.
    pub fn pump(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        while let Some(signal) = self.push.as_mut().and_then(PushConnection::try_next) {
            self.reconciler.apply_signal(signal, now);
            applied += 1;
        }
        self.reconciler.expire_new_posts(now);
        applied
    }

    pub fn emit(&self, command: OutboundCommand) -> Result<(), ConnectuiError> {
        self.push
            .as_ref()
            .ok_or_else(|| ConnectuiError::Transport("push connection is not open".to_string()))?
            .emit(command)
    }

    pub fn join_conversation(&self, user_id: UserId) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::JoinConversation { user_id })
    }

    pub fn leave_conversation(&self, user_id: UserId) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::LeaveConversation { user_id })
    }

    pub fn send_message(&self, recipient_id: UserId, content: &str) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::SendMessage {
            recipient_id,
            content: content.to_string(),
        })
    }

    pub fn typing_start(&self, user_id: UserId) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::TypingStart { user_id })
    }

    pub fn typing_stop(&self, user_id: UserId) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::TypingStop { user_id })
    }

    pub fn mark_messages_read(&self, conversation_id: i64) -> Result<(), ConnectuiError> {
        self.emit(OutboundCommand::MarkMessagesRead { conversation_id })
    }

    pub async fn refresh_timeline(&mut self) -> Result<usize, ConnectuiError> {
        let posts = self.api.timeline().await?;
        let count = posts.len();
        self.reconciler.replace_posts(posts);
        Ok(count)
    }

    pub async fn refresh_notifications(&mut self) -> Result<usize, ConnectuiError> {
        let page = self.api.notifications().await?;
        let count = page.notifications.len();
        self.reconciler.replace_notifications(page.notifications, page.unread_count);
        Ok(count)
    }

    pub async fn mark_notifications_read(&mut self) -> Result<(), ConnectuiError> {
        self.api.mark_notifications_read().await?;
        self.reconciler.mark_notifications_seen();
        Ok(())
    }

    pub async fn submit_post(&mut self, content: &str) -> Result<PostId, ConnectuiError> {
        self.viewer_id()?;
        let content = post_controller::validate_post(content)?;
        let post = self.api.create_post(content).await?;
        let id = post.id;
        self.reconciler.on_create(post, Instant::now());
        Ok(id)
    }

    pub fn can_delete(&self, post: &Post) -> bool {
        self.user.as_ref().is_some_and(|u| post.is_owned_by(u.id))
    }

    pub async fn delete_post(&mut self, post_id: PostId) -> Result<(), ConnectuiError> {
        let viewer = self.viewer_id()?;
        if let Some(post) = self.reconciler.post(post_id) {
            if !post.is_owned_by(viewer) {
                return Err(ConnectuiError::InvalidPost(format!(
                    "post {} belongs to someone else",
                    post_id
                )));
            }
        }
        self.api.delete_post(post_id).await?;
        self.reconciler.on_delete(post_id);
        Ok(())
    }

    pub async fn share_post(&mut self, post_id: PostId) -> Result<u64, ConnectuiError> {
        self.viewer_id()?;
        let shares = self.api.share_post(post_id).await?;
        let mut patch = PostPatch::new(post_id);
        patch.shares_count = Some(shares);
        self.reconciler.on_update(&patch);
        Ok(shares)
    }

    pub fn begin_like(&mut self, post_id: PostId) -> Option<LikeTicket> {
        self.reconciler.begin_like(post_id)
    }

    pub fn settle_like(
        &mut self,
        ticket: LikeTicket,
        outcome: Result<LikeOutcome, ConnectuiError>,
    ) -> bool {
        self.reconciler.settle_like(ticket, outcome)
    }

    pub async fn toggle_like(&mut self, post_id: PostId) -> bool {
        self.reconciler.toggle_like(self.api.as_ref(), post_id).await
    }
}
