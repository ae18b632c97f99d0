pub mod models;
pub mod views;
pub mod controllers;
pub mod i18n;
pub mod cli;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use models::{Config, HttpApi, Post, SocialApi};
pub use controllers::{start_app, Reconciler, Session};
pub use error::ConnectuiError;
pub use i18n::{LocaleCatalog, Translator};
