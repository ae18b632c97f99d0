use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use chrono::Utc;
use ratatui::{
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    layout::{Layout, Constraint, Direction, Rect},
    style::{Style, Color, Modifier},
    Terminal, Frame,
    text::Line,
    prelude::Span,
};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    execute,
    event::{DisableMouseCapture, EnableMouseCapture},
};

use crate::controllers::Session;
use crate::i18n::Translator;
use crate::models::{Notification, Post, PostId, Segment};
use crate::params;
use crate::views::widgets::ListCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Timeline,
    Notifications,
}

/// Bottom line of the screen. Translated at render time so a locale change
/// is picked up immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    Hint,
    Key(&'static str),
    Typing { handle: String },
    Message { handle: String, preview: String },
    Text(String),
}

pub struct ViewState {
    pub cursor: ListCursor,
    pub notifications_cursor: ListCursor,
    pub pane: Pane,
    pub status: Rc<RefCell<StatusLine>>,
    pub confirm_delete: Option<PostId>,
    pub refreshing: bool,
}

impl ViewState {
    pub fn new(posts: usize) -> Self {
        Self {
            cursor: ListCursor::new(posts),
            notifications_cursor: ListCursor::default(),
            pane: Pane::Timeline,
            status: Rc::new(RefCell::new(StatusLine::Hint)),
            confirm_delete: None,
            refreshing: false,
        }
    }

    pub fn set_status(&self, status: StatusLine) {
        *self.status.borrow_mut() = status;
    }

    /// Re-point the timeline cursor at `selected` after the list changed
    /// under it. Falls back to clamping when that post is gone.
    pub fn follow_post(&mut self, posts: &[Post], selected: Option<PostId>) {
        match selected.and_then(|id| posts.iter().position(|p| p.id == id)) {
            Some(index) => self.cursor.state.select(Some(index)),
            None => self.cursor.clamp(posts.len()),
        }
    }
}

pub fn setup_terminal() -> io::Result<Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

pub fn restore_terminal(terminal: &mut Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}

/// Hand the real terminal to a child process (the editor).
pub fn suspend_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
}

pub fn resume_terminal<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>) -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    terminal.clear()
}

pub fn status_text(t: &Translator, status: &StatusLine) -> String {
    match status {
        StatusLine::Hint => t.t("help.keys"),
        StatusLine::Key(key) => t.t(key),
        StatusLine::Typing { handle } => t.t_with("messages.typing", &params!("handle" => handle)),
        StatusLine::Message { handle, preview } => t.t_with(
            "messages.new_message_from",
            &params!("handle" => handle, "preview" => preview),
        ),
        StatusLine::Text(text) => text.clone(),
    }
}

pub fn render_ui<B: ratatui::backend::Backend>(
    f: &mut Frame<B>,
    session: &Session,
    view: &mut ViewState,
) {
    let t = session.translator();
    let banner = banner_lines(session);

    // Create the layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(banner.len() as u16),
                Constraint::Min(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.size());

    f.render_widget(Paragraph::new(banner), chunks[0]);

    match view.pane {
        Pane::Timeline => render_timeline(f, chunks[1], session, view),
        Pane::Notifications => render_notifications(f, chunks[1], session, view),
    }

    let status = match view.confirm_delete {
        Some(_) => format!("{} {}", t.t("post.delete_confirm_title"), t.t("post.delete_confirm_message")),
        None => status_text(t, &view.status.borrow()),
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(status, Style::default().fg(Color::DarkGray)))),
        chunks[2],
    );
}

fn banner_lines(session: &Session) -> Vec<Line<'static>> {
    let t = session.translator();
    let reconciler = session.reconciler();
    let mut lines = Vec::new();

    if reconciler.is_connected() {
        lines.push(Line::from(Span::styled(
            format!("● {}", t.t("home.connected")),
            Style::default().fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("○ {}", t.t("home.disconnected")),
            Style::default().fg(Color::Yellow),
        )));
    }

    let fresh = reconciler.new_posts_count();
    if fresh > 0 {
        lines.push(Line::from(Span::styled(
            format!(
                "{} {} {}  [x] {}",
                fresh,
                t.tp("home.new_posts", fresh as u64),
                t.t("home.from_following"),
                t.t("home.dismiss")
            ),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        )));
    }

    let unread = reconciler.unread_notifications();
    if unread > 0 {
        lines.push(Line::from(Span::styled(
            t.tp("notifications.unread", unread as u64),
            Style::default().fg(Color::Magenta),
        )));
    }
    lines
}

fn content_lines(post: &Post) -> Vec<Line<'_>> {
    let marker = Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    post.content
        .split('\n')
        .map(|line| {
            let spans: Vec<Span> = crate::models::post::segments(line)
                .into_iter()
                .map(|segment| match segment {
                    Segment::Text(text) => Span::raw(text),
                    Segment::Mention(m) | Segment::Hashtag(m) => Span::styled(m, marker),
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn post_item<'a>(post: &'a Post, session: &Session, now: chrono::DateTime<Utc>) -> ListItem<'a> {
    let t = session.translator();
    let reconciler = session.reconciler();

    let (name, handle, online) = match &post.author {
        Some(author) => (
            format!("[{}] {}", author.initials(), author.display_name()),
            format!(" @{}", author.handle),
            reconciler.is_online(author.id),
        ),
        None => ("?".to_string(), String::new(), false),
    };

    // Create the header line with author and relative time
    let mut header = vec![
        Span::styled(name, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(handle, Style::default().fg(Color::Gray)),
        Span::styled(
            format!(" · {}", t.format_relative_time(post.created_at, now)),
            Style::default().fg(Color::Gray),
        ),
    ];
    if online {
        header.push(Span::styled(
            format!(" ● {}", t.t("presence.online")),
            Style::default().fg(Color::Green),
        ));
    }

    let like_style = if post.is_liked {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let actions = Line::from(vec![
        Span::styled(format!("↩ {}   ", post.replies_count), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("{} {}   ", if post.is_liked { "♥" } else { "♡" }, post.likes_count),
            like_style,
        ),
        Span::styled(format!("⇄ {}", post.shares_count), Style::default().fg(Color::Gray)),
    ]);

    let mut all_lines = vec![Line::from(header)];
    all_lines.extend(content_lines(post));
    all_lines.push(actions);
    all_lines.push(Line::from(""));

    ListItem::new(all_lines)
}

fn render_timeline<B: ratatui::backend::Backend>(
    f: &mut Frame<B>,
    area: Rect,
    session: &Session,
    view: &mut ViewState,
) {
    let t = session.translator();
    let posts = session.reconciler().posts();

    let mut title = t.t("home.title");
    if view.refreshing {
        title = format!("{} - {}", title, t.t("home.refreshing"));
    }
    let block = Block::default().title(title).borders(Borders::ALL);

    if posts.is_empty() {
        let empty = Paragraph::new(t.t("home.no_posts"))
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(empty, area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = posts
        .iter()
        .map(|post| post_item(post, session, now))
        .collect();

    // Create a List from the items and highlight the currently selected one
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Gray)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        );

    f.render_stateful_widget(list, area, &mut view.cursor.state);
}

fn notification_item<'a>(n: &'a Notification, t: &Translator, now: chrono::DateTime<Utc>) -> ListItem<'a> {
    let style = if n.is_read {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    ListItem::new(Line::from(vec![
        Span::styled(n.message.as_str(), style),
        Span::styled(
            format!(" · {}", t.format_relative_time(n.created_at, now)),
            Style::default().fg(Color::Gray),
        ),
    ]))
}

fn render_notifications<B: ratatui::backend::Backend>(
    f: &mut Frame<B>,
    area: Rect,
    session: &Session,
    view: &mut ViewState,
) {
    let t = session.translator();
    let notifications = session.reconciler().notifications();
    let block = Block::default().title(t.t("notifications.title")).borders(Borders::ALL);

    if notifications.is_empty() {
        f.render_widget(Paragraph::new(t.t("notifications.empty")).block(block), area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = notifications
        .iter()
        .map(|n| notification_item(n, t, now))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Gray).fg(Color::Black));

    f.render_stateful_widget(list, area, &mut view.notifications_cursor.state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::i18n::LocaleCatalog;

    fn post(id: PostId) -> Post {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "content": "hi",
            "user_id": 1,
            "created_at": "2024-05-01T10:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn selection_stays_on_post_when_one_is_prepended() {
        let mut posts = vec![post(3), post(2), post(1)];
        let mut view = ViewState::new(posts.len());
        view.cursor.next(posts.len());
        assert_eq!(view.cursor.selected(), Some(1));

        posts.insert(0, post(4));
        view.follow_post(&posts, Some(2));
        assert_eq!(view.cursor.selected(), Some(2));

        // selected post deleted: stay in range
        posts.truncate(1);
        view.follow_post(&posts, Some(2));
        assert_eq!(view.cursor.selected(), Some(0));
    }

    #[test]
    fn status_lines_are_translated() {
        let t = Translator::new(Arc::new(LocaleCatalog::bundled().unwrap()), "fr");
        assert_eq!(
            status_text(&t, &StatusLine::Typing { handle: "bo".to_string() }),
            "bo est en train d'écrire..."
        );
        // fr has no entry, falls back to en
        assert_eq!(
            status_text(
                &t,
                &StatusLine::Message { handle: "bo".to_string(), preview: "hi".to_string() }
            ),
            "New message from bo: hi"
        );
        assert_eq!(status_text(&t, &StatusLine::Key("post.deleted")), "Publication supprimée");
    }
}
