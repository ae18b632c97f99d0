use std::env;
use std::fs;
use std::process::Command;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::controllers::reconciler::LikeTicket;
use crate::error::ConnectuiError;
use crate::models::{LikeOutcome, SocialApi};

/// Longest post the backend accepts, in characters.
pub const MAX_POST_CHARS: usize = 250;

/// Result of a like request that ran off the UI loop.
#[derive(Debug)]
pub struct LikeCompletion {
    pub ticket: LikeTicket,
    pub outcome: Result<LikeOutcome, ConnectuiError>,
}

/// Trimmed content, or why it cannot be posted.
pub fn validate_post(content: &str) -> Result<&str, ConnectuiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ConnectuiError::InvalidPost("Content is required".to_string()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(ConnectuiError::InvalidPost(format!(
            "Content must be {} characters or less (got {})",
            MAX_POST_CHARS, chars
        )));
    }
    Ok(trimmed)
}

/// Send the like request in the background; the completion comes back on
/// `done` so the loop owning the reconciler can settle it.
pub fn spawn_like_request(
    api: Arc<dyn SocialApi>,
    ticket: LikeTicket,
    done: UnboundedSender<LikeCompletion>,
) {
    tokio::spawn(async move {
        let outcome = api.toggle_like(ticket.post_id).await;
        if done.send(LikeCompletion { ticket, outcome }).is_err() {
            log::debug!("like completion for post {} dropped, loop is gone", ticket.post_id);
        }
    });
}

pub fn create_post_via_editor() -> Result<String, ConnectuiError> {
    let editor = env::var("EDITOR")
        .unwrap_or_else(|_| "vi".to_string());

    let mut temp_path = env::temp_dir();
    temp_path.push(format!("connectui-post-{}.txt", std::process::id()));

    let status = Command::new(editor)
        .arg(&temp_path)
        .status()?;

    if !status.success() {
        let _ = fs::remove_file(&temp_path);
        return Err(ConnectuiError::Io(
            "Editor exited with non-zero status".to_string()
        ));
    }

    // An editor that quits without saving leaves no file behind.
    let content = match fs::read_to_string(&temp_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let _ = fs::remove_file(&temp_path);
    Ok(content)
}
