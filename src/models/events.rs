//! Wire vocabulary of the push channel.
//!
//! The channel is Socket.IO: each message is an event name plus one JSON
//! argument. [`Frame`] pairs the two.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::notification::Notification;
use crate::models::post::{Post, PostId, PostPatch};
use crate::models::user::UserId;

/// Event name and payload before the name is interpreted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Server greeting after the upgrade. Informational only.
    Hello { message: String },
    NewPost(Post),
    PostUpdated(PostPatch),
    PostDeleted(PostId),
    UserOnline(UserId),
    UserOffline(UserId),
    NewNotification(Notification),
    NewMessage(Value),
    MessageNotification(Value),
    UserTyping(Value),
    ServerError { message: String },
}

#[derive(Deserialize)]
struct PostPayload<T> {
    post: T,
}

#[derive(Deserialize)]
struct DeletedPayload {
    post_id: PostId,
}

#[derive(Deserialize)]
struct PresencePayload {
    user_id: UserId,
}

#[derive(Deserialize)]
struct NotificationPayload {
    notification: Notification,
}

#[derive(Deserialize, Default)]
struct MessagePayload {
    #[serde(default)]
    message: String,
}

impl InboundEvent {
    /// Interpret a frame. `Ok(None)` means the event name is not one we
    /// handle; malformed payloads for known names are errors.
    pub fn from_frame(frame: Frame) -> Result<Option<Self>, serde_json::Error> {
        let Frame { event, data } = frame;
        let parsed = match event.as_str() {
            "connected" => {
                let payload: MessagePayload = serde_json::from_value(data).unwrap_or_default();
                InboundEvent::Hello { message: payload.message }
            }
            "new_post" => {
                let payload: PostPayload<Post> = serde_json::from_value(data)?;
                InboundEvent::NewPost(payload.post)
            }
            "post_updated" => {
                let payload: PostPayload<PostPatch> = serde_json::from_value(data)?;
                InboundEvent::PostUpdated(payload.post)
            }
            "post_deleted" => {
                let payload: DeletedPayload = serde_json::from_value(data)?;
                InboundEvent::PostDeleted(payload.post_id)
            }
            "user_online" => {
                let payload: PresencePayload = serde_json::from_value(data)?;
                InboundEvent::UserOnline(payload.user_id)
            }
            "user_offline" => {
                let payload: PresencePayload = serde_json::from_value(data)?;
                InboundEvent::UserOffline(payload.user_id)
            }
            "new_notification" => {
                let payload: NotificationPayload = serde_json::from_value(data)?;
                InboundEvent::NewNotification(payload.notification)
            }
            "new_message" => InboundEvent::NewMessage(data),
            "message_notification" => InboundEvent::MessageNotification(data),
            "user_typing" => InboundEvent::UserTyping(data),
            "error" => {
                let payload: MessagePayload = serde_json::from_value(data).unwrap_or_default();
                InboundEvent::ServerError { message: payload.message }
            }
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }
}

/// Commands the client emits on the push channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundCommand {
    JoinConversation { user_id: UserId },
    LeaveConversation { user_id: UserId },
    SendMessage { recipient_id: UserId, content: String },
    TypingStart { user_id: UserId },
    TypingStop { user_id: UserId },
    MarkMessagesRead { conversation_id: i64 },
}

impl OutboundCommand {
    /// Event name and argument to emit.
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

/// What the transport hands to the session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    Connected,
    Disconnected,
    Event(InboundEvent),
}
