#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use connectui::error::ConnectuiError;
use connectui::models::{
    Credentials, LikeOutcome, NotificationPage, Post, PostId, SocialApi, User, UserId, UserSummary,
};

pub fn post(id: PostId, author: UserId) -> Post {
    Post {
        id,
        user_id: Some(author),
        author: Some(UserSummary {
            id: author,
            handle: format!("user{author}"),
            ..UserSummary::default()
        }),
        content: format!("post {id}"),
        created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        updated_at: None,
        parent_id: None,
        likes_count: 10,
        replies_count: 0,
        shares_count: 0,
        is_liked: false,
    }
}

pub fn user(id: UserId, language: Option<&str>) -> User {
    User {
        id,
        handle: format!("user{id}"),
        preferred_language: language.map(str::to_string),
        ..User::default()
    }
}

/// Scripted backend. Like outcomes are served in order; calls are recorded.
#[derive(Default)]
pub struct MockApi {
    pub user: Mutex<Option<User>>,
    pub timeline: Mutex<Vec<Post>>,
    pub like_outcomes: Mutex<VecDeque<Result<LikeOutcome, ConnectuiError>>>,
    pub calls: Mutex<Vec<String>>,
    pub next_post_id: Mutex<PostId>,
}

impl MockApi {
    pub fn with_user(user: User) -> Self {
        let api = Self::default();
        *api.user.lock().unwrap() = Some(user);
        api
    }

    pub fn push_like(&self, outcome: Result<LikeOutcome, ConnectuiError>) {
        self.like_outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn unauthorized() -> ConnectuiError {
        ConnectuiError::Api { status: 401, message: "Authentication required".to_string() }
    }
}

#[async_trait]
impl SocialApi for MockApi {
    async fn current_user(&self) -> Result<User, ConnectuiError> {
        self.record("current_user".to_string());
        self.user.lock().unwrap().clone().ok_or_else(Self::unauthorized)
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ConnectuiError> {
        self.record(format!("login {}", credentials.handle));
        self.user.lock().unwrap().clone().ok_or_else(Self::unauthorized)
    }

    async fn logout(&self) -> Result<(), ConnectuiError> {
        self.record("logout".to_string());
        Ok(())
    }

    async fn timeline(&self) -> Result<Vec<Post>, ConnectuiError> {
        self.record("timeline".to_string());
        Ok(self.timeline.lock().unwrap().clone())
    }

    async fn create_post(&self, content: &str) -> Result<Post, ConnectuiError> {
        self.record(format!("create_post {content}"));
        let author = self.user.lock().unwrap().as_ref().map(|u| u.id).ok_or_else(Self::unauthorized)?;
        let mut next = self.next_post_id.lock().unwrap();
        *next += 1;
        let mut created = post(1000 + *next, author);
        created.content = content.to_string();
        created.likes_count = 0;
        Ok(created)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), ConnectuiError> {
        self.record(format!("delete_post {id}"));
        Ok(())
    }

    async fn toggle_like(&self, id: PostId) -> Result<LikeOutcome, ConnectuiError> {
        self.record(format!("toggle_like {id}"));
        self.like_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ConnectuiError::Network("no scripted outcome".to_string())))
    }

    async fn share_post(&self, id: PostId) -> Result<u64, ConnectuiError> {
        self.record(format!("share_post {id}"));
        Ok(1)
    }

    async fn notifications(&self) -> Result<NotificationPage, ConnectuiError> {
        self.record("notifications".to_string());
        Ok(NotificationPage { notifications: Vec::new(), unread_count: 0 })
    }

    async fn mark_notifications_read(&self) -> Result<(), ConnectuiError> {
        self.record("mark_notifications_read".to_string());
        Ok(())
    }

    fn persist_session(&self) -> Result<(), ConnectuiError> {
        self.record("persist_session".to_string());
        Ok(())
    }

    fn forget_session(&self) -> Result<(), ConnectuiError> {
        self.record("forget_session".to_string());
        Ok(())
    }
}
