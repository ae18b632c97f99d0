pub mod api;
pub mod config;
pub mod events;
pub mod notification;
pub mod post;
pub mod transport;
pub mod user;

// Re-export important structs for convenience
pub use api::{default_session_file, Credentials, HttpApi, LikeOutcome, NotificationPage, SocialApi};
pub use config::Config;
pub use events::{Frame, InboundEvent, OutboundCommand, TransportSignal};
pub use notification::{Notification, NotificationKind};
pub use post::{Post, PostId, PostPatch, Segment};
pub use transport::PushConnection;
pub use user::{User, UserId, UserSummary};
