use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::post::{timestamp, Post};
use crate::models::user::UserSummary;

pub type NotificationId = i64;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Reply,
    Share,
    Follow,
    Mention,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub related_user: Option<UserSummary>,
    #[serde(default)]
    pub related_post: Option<Post>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}
