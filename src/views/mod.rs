pub mod tui;
pub mod widgets;

pub use tui::{Pane, StatusLine, ViewState};
pub use widgets::ListCursor;
