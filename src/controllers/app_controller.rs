use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::Terminal;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::controllers::event_bus::{BusEvent, EventKind, SubscriptionToken};
use crate::controllers::post_controller::{self, LikeCompletion};
use crate::controllers::Session;
use crate::error::ConnectuiError;
use crate::params;
use crate::views::{tui, Pane, StatusLine, ViewState};

const TICK: Duration = Duration::from_millis(250);
const PAGE: usize = 5;

pub async fn start_app(session: &mut Session) -> Result<(), ConnectuiError> {
    // Setup terminal
    let mut terminal = tui::setup_terminal()?;

    let mut view = ViewState::new(session.reconciler().posts().len());
    let tokens = subscribe_status(session, &view);

    // Run the app
    let res = run_app(&mut terminal, session, &mut view).await;

    for token in tokens {
        session.reconciler_mut().unsubscribe(token);
    }

    // Restore terminal
    tui::restore_terminal(&mut terminal)?;
    session.close_push();

    res
}

fn str_field<'a>(payload: &'a Value, key: &str) -> &'a str {
    payload.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Route chat-side push events to the status line.
fn subscribe_status(session: &mut Session, view: &ViewState) -> Vec<SubscriptionToken> {
    let reconciler = session.reconciler_mut();
    let mut tokens = Vec::new();

    let status = view.status.clone();
    tokens.push(reconciler.subscribe(EventKind::UserTyping, move |event| {
        if let BusEvent::UserTyping(payload) = event {
            let typing = payload.get("typing").and_then(Value::as_bool).unwrap_or(false);
            *status.borrow_mut() = if typing {
                StatusLine::Typing { handle: str_field(payload, "handle").to_string() }
            } else {
                StatusLine::Hint
            };
        }
    }));

    let status = view.status.clone();
    tokens.push(reconciler.subscribe(EventKind::MessageNotification, move |event| {
        if let BusEvent::MessageNotification(payload) = event {
            let handle = payload
                .get("sender")
                .map(|sender| str_field(sender, "handle"))
                .unwrap_or_default();
            *status.borrow_mut() = StatusLine::Message {
                handle: handle.to_string(),
                preview: str_field(payload, "preview").to_string(),
            };
        }
    }));

    let status = view.status.clone();
    tokens.push(reconciler.subscribe(EventKind::NotificationReceived, move |event| {
        if let BusEvent::NotificationReceived(n) = event {
            *status.borrow_mut() = StatusLine::Text(n.message.clone());
        }
    }));

    tokens
}

fn settle_likes(
    session: &mut Session,
    view: &ViewState,
    completions: &mut UnboundedReceiver<LikeCompletion>,
) {
    while let Ok(LikeCompletion { ticket, outcome }) = completions.try_recv() {
        if let Err(e) = &outcome {
            log::warn!("like on post {} failed: {}", ticket.post_id, e);
        }
        if !session.settle_like(ticket, outcome) {
            view.set_status(StatusLine::Key("post.like_failed"));
        }
    }
}

fn selected_post(session: &Session, view: &ViewState) -> Option<crate::models::PostId> {
    let index = view.cursor.selected()?;
    session.reconciler().posts().get(index).map(|p| p.id)
}

pub async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    session: &mut Session,
    view: &mut ViewState,
) -> Result<(), ConnectuiError> {
    let (like_tx, mut like_rx) = mpsc::unbounded_channel::<LikeCompletion>();

    loop {
        let selected = selected_post(session, view);
        session.pump(Instant::now());
        settle_likes(session, view, &mut like_rx);
        view.follow_post(session.reconciler().posts(), selected);
        view.notifications_cursor.clamp(session.reconciler().notifications().len());

        terminal.draw(|f| tui::render_ui(f, session, view))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(post_id) = view.confirm_delete.take() {
            if key.code == KeyCode::Char('y') {
                match session.delete_post(post_id).await {
                    Ok(()) => view.set_status(StatusLine::Key("post.deleted")),
                    Err(e) => {
                        log::warn!("delete of post {} failed: {}", post_id, e);
                        view.set_status(StatusLine::Text(e.to_string()));
                    }
                }
            }
            continue;
        }

        if !handle_key(key, terminal, session, view, &like_tx).await? {
            return Ok(());
        }
    }
}

/// Returns `false` when the user asked to quit.
async fn handle_key<B: ratatui::backend::Backend>(
    key: KeyEvent,
    terminal: &mut Terminal<B>,
    session: &mut Session,
    view: &mut ViewState,
    like_tx: &UnboundedSender<LikeCompletion>,
) -> Result<bool, ConnectuiError> {
    let len = match view.pane {
        Pane::Timeline => session.reconciler().posts().len(),
        Pane::Notifications => session.reconciler().notifications().len(),
    };
    let cursor = match view.pane {
        Pane::Timeline => &mut view.cursor,
        Pane::Notifications => &mut view.notifications_cursor,
    };

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
        KeyCode::Down | KeyCode::Char('j') => cursor.next(len),
        KeyCode::Up | KeyCode::Char('k') => cursor.previous(len),
        KeyCode::Home | KeyCode::Char('g') => cursor.first(len),
        KeyCode::End | KeyCode::Char('G') => cursor.last(len),
        KeyCode::PageUp => cursor.jump_up(PAGE, len),
        KeyCode::PageDown => cursor.jump_down(PAGE, len),
        KeyCode::Char('r') => {
            view.refreshing = true;
            terminal.draw(|f| tui::render_ui(f, session, view))?;
            let result = match view.pane {
                Pane::Timeline => session.refresh_timeline().await,
                Pane::Notifications => session.refresh_notifications().await,
            };
            view.refreshing = false;
            if let Err(e) = result {
                log::warn!("refresh failed: {}", e);
                view.set_status(StatusLine::Text(e.to_string()));
            }
        }
        KeyCode::Char('x') => session.reconciler_mut().dismiss_new_posts(),
        KeyCode::Tab => {
            view.pane = match view.pane {
                Pane::Timeline => Pane::Notifications,
                Pane::Notifications => Pane::Timeline,
            };
            if view.pane == Pane::Notifications && session.reconciler().unread_notifications() > 0 {
                if let Err(e) = session.mark_notifications_read().await {
                    log::warn!("marking notifications read failed: {}", e);
                }
            }
        }
        KeyCode::Char('l') if view.pane == Pane::Timeline => {
            if let Some(post_id) = selected_post(session, view) {
                if let Some(ticket) = session.begin_like(post_id) {
                    post_controller::spawn_like_request(session.api(), ticket, like_tx.clone());
                }
            }
        }
        KeyCode::Char('s') if view.pane == Pane::Timeline => {
            if let Some(post_id) = selected_post(session, view) {
                match session.share_post(post_id).await {
                    Ok(_) => view.set_status(StatusLine::Key("post.shared")),
                    Err(e) => {
                        log::warn!("share of post {} failed: {}", post_id, e);
                        view.set_status(StatusLine::Text(e.to_string()));
                    }
                }
            }
        }
        KeyCode::Char('d') if view.pane == Pane::Timeline => {
            if let Some(post_id) = selected_post(session, view) {
                let owned = session
                    .reconciler()
                    .post(post_id)
                    .is_some_and(|post| session.can_delete(post));
                if owned {
                    view.confirm_delete = Some(post_id);
                } else {
                    view.set_status(StatusLine::Key("post.not_owner"));
                }
            }
        }
        KeyCode::Char('n') => {
            tui::suspend_terminal()?;
            let edited = post_controller::create_post_via_editor();
            tui::resume_terminal(terminal)?;

            let status = match edited {
                Ok(content) => match session.submit_post(&content).await {
                    Ok(_) => {
                        view.pane = Pane::Timeline;
                        view.cursor.first(session.reconciler().posts().len());
                        StatusLine::Key("post.published")
                    }
                    Err(ConnectuiError::InvalidPost(_)) if content.trim().is_empty() => {
                        StatusLine::Key("post.empty")
                    }
                    Err(ConnectuiError::InvalidPost(_)) => StatusLine::Text(session.translator().t_with(
                        "post.too_long",
                        &params!("max" => post_controller::MAX_POST_CHARS),
                    )),
                    Err(e) => {
                        log::warn!("post submission failed: {}", e);
                        StatusLine::Text(e.to_string())
                    }
                },
                Err(e) => StatusLine::Text(e.to_string()),
            };
            view.set_status(status);
        }
        _ => {}
    }
    Ok(true)
}
