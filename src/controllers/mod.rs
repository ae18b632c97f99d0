pub mod app_controller;
pub mod event_bus;
pub mod post_controller;
pub mod reconciler;
pub mod session;

// Re-export key types
pub use app_controller::start_app;
pub use event_bus::{BusEvent, EventBus, EventKind, SubscriptionToken};
pub use reconciler::{LikeTicket, Reconciler, NEW_POST_NOTICE};
pub use session::Session;
