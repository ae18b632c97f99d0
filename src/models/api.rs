use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ConnectuiError;
use crate::models::notification::Notification;
use crate::models::post::{Post, PostId};
use crate::models::user::User;

/// Authoritative like state returned by the backend after a toggle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub likes_count: u64,
    pub is_liked: bool,
}

/// First page of the viewer's notifications.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: usize,
}

/// The backend accepts a handle or an email under `login`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Credentials {
    #[serde(rename = "login")]
    pub handle: String,
    pub password: String,
}

/// REST collaborator of the client.
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn current_user(&self) -> Result<User, ConnectuiError>;

    async fn login(&self, credentials: &Credentials) -> Result<User, ConnectuiError>;

    async fn logout(&self) -> Result<(), ConnectuiError>;

    async fn timeline(&self) -> Result<Vec<Post>, ConnectuiError>;

    async fn create_post(&self, content: &str) -> Result<Post, ConnectuiError>;

    async fn delete_post(&self, id: PostId) -> Result<(), ConnectuiError>;

    async fn toggle_like(&self, id: PostId) -> Result<LikeOutcome, ConnectuiError>;

    /// Returns the new share count.
    async fn share_post(&self, id: PostId) -> Result<u64, ConnectuiError>;

    async fn notifications(&self) -> Result<NotificationPage, ConnectuiError>;

    async fn mark_notifications_read(&self) -> Result<(), ConnectuiError>;

    /// Cookie header to present on the push upgrade, if any.
    fn session_cookie(&self) -> Option<String> {
        None
    }

    /// Keep the current session for the next start.
    fn persist_session(&self) -> Result<(), ConnectuiError> {
        Ok(())
    }

    /// Drop any kept session.
    fn forget_session(&self) -> Result<(), ConnectuiError> {
        Ok(())
    }
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct PostEnvelope {
    post: Post,
}

#[derive(Deserialize)]
struct TimelineEnvelope {
    posts: Vec<Post>,
}

#[derive(Deserialize)]
struct ShareEnvelope {
    shares_count: u64,
}

/// On-disk form of the session cookies, tied to the server that set them.
#[derive(Serialize, Deserialize)]
struct SavedSession {
    origin: String,
    cookie: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// `reqwest`-backed client keeping the session cookie in a shared jar.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    session_file: Option<PathBuf>,
}

pub fn default_session_file() -> Result<PathBuf, ConnectuiError> {
    Ok(dirs::cache_dir()
        .ok_or_else(|| ConnectuiError::Config("Could not find cache directory".to_string()))?
        .join("connectui/session.json"))
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, ConnectuiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConnectuiError::Config(format!("Invalid api_url {}: {}", base_url, e)))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Self { http, jar, base_url, session_file: None })
    }

    /// Restore cookies saved by an earlier run and keep `path` for
    /// [`SocialApi::persist_session`]. A file for another server or one that
    /// does not parse is ignored.
    pub fn with_session_file(mut self, path: PathBuf) -> Result<Self, ConnectuiError> {
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<SavedSession>(&raw) {
                Ok(saved) if saved.origin == self.origin() => {
                    for pair in saved.cookie.split("; ").filter(|p| !p.is_empty()) {
                        self.jar.add_cookie_str(pair, &self.base_url);
                    }
                    log::info!("restored session from {:?}", path);
                }
                Ok(saved) => log::info!("ignoring saved session for {}", saved.origin),
                Err(e) => log::warn!("unreadable session file {:?}: {}", path, e),
            }
        }
        self.session_file = Some(path);
        Ok(self)
    }

    fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }

    fn write_session(&self, path: &Path, cookie: String) -> Result<(), ConnectuiError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let saved = SavedSession { origin: self.origin(), cookie };
        fs::write(path, serde_json::to_string(&saved)?)?;
        log::debug!("saved session to {:?}", path);
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, ConnectuiError> {
        self.base_url
            .join(path)
            .map_err(|e| ConnectuiError::Config(format!("Invalid path {}: {}", path, e)))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ConnectuiError> {
        let url = self.url(path)?;
        log::debug!("API request: {} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        log::warn!("API error: {} {}", status.as_u16(), message);
        Err(ConnectuiError::Api { status: status.as_u16(), message })
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ConnectuiError> {
        let response = self.send(method, path, body).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SocialApi for HttpApi {
    async fn current_user(&self) -> Result<User, ConnectuiError> {
        let envelope: UserEnvelope = self.json(Method::GET, "/auth/me", None).await?;
        Ok(envelope.user)
    }

    async fn login(&self, credentials: &Credentials) -> Result<User, ConnectuiError> {
        let body = serde_json::to_value(credentials)?;
        let envelope: UserEnvelope = self.json(Method::POST, "/auth/login", Some(body)).await?;
        Ok(envelope.user)
    }

    async fn logout(&self) -> Result<(), ConnectuiError> {
        self.send(Method::POST, "/auth/logout", None).await?;
        Ok(())
    }

    async fn timeline(&self) -> Result<Vec<Post>, ConnectuiError> {
        let envelope: TimelineEnvelope = self.json(Method::GET, "/posts/timeline", None).await?;
        Ok(envelope.posts)
    }

    async fn create_post(&self, content: &str) -> Result<Post, ConnectuiError> {
        let envelope: PostEnvelope = self
            .json(Method::POST, "/posts/", Some(json!({ "content": content })))
            .await?;
        Ok(envelope.post)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), ConnectuiError> {
        self.send(Method::DELETE, &format!("/posts/{id}"), None).await?;
        Ok(())
    }

    async fn toggle_like(&self, id: PostId) -> Result<LikeOutcome, ConnectuiError> {
        self.json(Method::POST, &format!("/posts/{id}/like"), None).await
    }

    async fn share_post(&self, id: PostId) -> Result<u64, ConnectuiError> {
        let shared: ShareEnvelope = self.json(Method::POST, &format!("/posts/{id}/share"), None).await?;
        Ok(shared.shares_count)
    }

    async fn notifications(&self) -> Result<NotificationPage, ConnectuiError> {
        self.json(Method::GET, "/users/notifications", None).await
    }

    async fn mark_notifications_read(&self) -> Result<(), ConnectuiError> {
        self.send(Method::POST, "/users/notifications/read-all", None).await?;
        Ok(())
    }

    fn session_cookie(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    fn persist_session(&self) -> Result<(), ConnectuiError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };
        match self.session_cookie() {
            Some(cookie) => self.write_session(path, cookie),
            None => self.forget_session(),
        }
    }

    fn forget_session(&self) -> Result<(), ConnectuiError> {
        if let Some(path) = self.session_file.as_deref().filter(|p| p.exists()) {
            fs::remove_file(path)?;
            log::debug!("removed session file {:?}", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn post_json(id: i64, likes: u64) -> serde_json::Value {
        json!({
            "id": id,
            "content": "hello #rust",
            "user_id": 1,
            "author": {"id": 1, "handle": "ana"},
            "created_at": "2024-05-01T10:00:00",
            "likes_count": likes,
            "replies_count": 0,
            "shares_count": 0
        })
    }

    #[tokio::test]
    async fn timeline_decodes_posts() {
        let server = MockServer::start_async().await;
        let mock = server.mock_async(|when, then| {
            when.method(GET).path("/posts/timeline");
            then.status(200)
                .json_body(json!({"posts": [post_json(2, 0), post_json(1, 5)], "pagination": {"page": 1}}));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let posts = api.timeline().await.unwrap();

        mock.assert_async().await;
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].likes_count, 5);
    }

    #[tokio::test]
    async fn toggle_like_returns_server_state() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/posts/7/like");
            then.status(200)
                .json_body(json!({"message": "Post liked", "likes_count": 11, "is_liked": true}));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let outcome = api.toggle_like(7).await.unwrap();
        assert_eq!(outcome, LikeOutcome { likes_count: 11, is_liked: true });
    }

    #[tokio::test]
    async fn share_returns_new_count() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/posts/7/share");
            then.status(200).json_body(json!({"message": "Post shared", "shares_count": 3}));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        assert_eq!(api.share_post(7).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn error_body_becomes_api_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/posts/");
            then.status(400).json_body(json!({"error": "Content is required"}));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let err = api.create_post("").await.unwrap_err();
        assert_eq!(
            err,
            ConnectuiError::Api { status: 400, message: "Content is required".to_string() }
        );
    }

    #[tokio::test]
    async fn login_stores_session_cookie() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/auth/login").json_body(json!({"login": "ana", "password": "pw"}));
            then.status(200)
                .header("set-cookie", "session=abc123; Path=/")
                .json_body(json!({"user": {"id": 1, "handle": "ana", "preferred_language": "fr"}}));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let user = api
            .login(&Credentials { handle: "ana".to_string(), password: "pw".to_string() })
            .await
            .unwrap();

        assert_eq!(user.preferred_locale(), Some("fr"));
        assert_eq!(api.session_cookie().as_deref(), Some("session=abc123"));
    }

    #[test]
    fn credentials_are_sent_as_login() {
        let credentials = Credentials { handle: "ana".to_string(), password: "pw".to_string() };
        assert_eq!(
            serde_json::to_value(&credentials).unwrap(),
            json!({"login": "ana", "password": "pw"})
        );
    }

    #[tokio::test]
    async fn session_survives_restart() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(200)
                .header("set-cookie", "session=abc123; Path=/")
                .json_body(json!({"user": {"id": 1, "handle": "ana"}}));
        }).await;
        let me = server.mock_async(|when, then| {
            when.method(GET).path("/auth/me").header("cookie", "session=abc123");
            then.status(200).json_body(json!({"user": {"id": 1, "handle": "ana"}}));
        }).await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cache/session.json");

        let api = HttpApi::new(&server.base_url()).unwrap().with_session_file(file.clone()).unwrap();
        api.login(&Credentials { handle: "ana".to_string(), password: "pw".to_string() })
            .await
            .unwrap();
        api.persist_session().unwrap();

        let restarted =
            HttpApi::new(&server.base_url()).unwrap().with_session_file(file.clone()).unwrap();
        assert_eq!(restarted.current_user().await.unwrap().handle, "ana");
        me.assert_async().await;

        restarted.forget_session().unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn session_for_another_server_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        fs::write(&file, r#"{"origin": "http://elsewhere:5000", "cookie": "session=zzz"}"#).unwrap();

        let api = HttpApi::new("http://localhost:5000").unwrap().with_session_file(file).unwrap();
        assert_eq!(api.session_cookie(), None);
    }

    #[tokio::test]
    async fn notifications_page_carries_unread_count() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/users/notifications");
            then.status(200).json_body(json!({
                "notifications": [{
                    "id": 3, "type": "like", "message": "bo liked your post",
                    "is_read": false, "created_at": "2024-05-01T10:00:00"
                }],
                "pagination": {"page": 1},
                "unread_count": 4
            }));
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let page = api.notifications().await.unwrap();
        assert_eq!(page.unread_count, 4);
        assert_eq!(page.notifications[0].message, "bo liked your post");
    }

    #[tokio::test]
    async fn unauthorized_is_detectable() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/auth/me");
            then.status(401).body("nope");
        }).await;

        let api = HttpApi::new(&server.base_url()).unwrap();
        let err = api.current_user().await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
