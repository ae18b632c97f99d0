use ratatui::widgets::ListState;

/// Selection over a list whose items live elsewhere (the reconciler owns
/// the posts), so every move takes the current length.
#[derive(Debug, Default, Clone)]
pub struct ListCursor {
    pub state: ListState,
}

impl ListCursor {
    pub fn new(len: usize) -> Self {
        let mut state = ListState::default();
        // Start with the first item selected
        if len > 0 {
            state.select(Some(0));
        }
        Self { state }
    }

    pub fn selected(&self) -> Option<usize> {
        self.state.selected()
    }

    pub fn next(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn first(&mut self, len: usize) {
        self.state.select(if len == 0 { None } else { Some(0) });
    }

    pub fn last(&mut self, len: usize) {
        self.state.select(len.checked_sub(1));
    }

    pub fn jump_up(&mut self, offset: usize, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(offset),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn jump_down(&mut self, offset: usize, len: usize) {
        if len == 0 {
            self.state.select(None);
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_add(offset).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Keep the selection valid after items were inserted or removed.
    pub fn clamp(&mut self, len: usize) {
        match (self.state.selected(), len) {
            (_, 0) => self.state.select(None),
            (None, _) => self.state.select(Some(0)),
            (Some(i), len) if i >= len => self.state.select(Some(len - 1)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_stay_in_bounds() {
        let mut cursor = ListCursor::new(3);
        cursor.previous(3);
        assert_eq!(cursor.selected(), Some(0));
        cursor.next(3);
        cursor.next(3);
        cursor.next(3);
        assert_eq!(cursor.selected(), Some(2));
        cursor.jump_up(10, 3);
        assert_eq!(cursor.selected(), Some(0));
        cursor.jump_down(10, 3);
        assert_eq!(cursor.selected(), Some(2));
    }

    #[test]
    fn clamp_follows_list_changes() {
        let mut cursor = ListCursor::new(0);
        assert_eq!(cursor.selected(), None);
        cursor.clamp(2);
        assert_eq!(cursor.selected(), Some(0));
        cursor.last(2);
        cursor.clamp(1);
        assert_eq!(cursor.selected(), Some(0));
        cursor.clamp(0);
        assert_eq!(cursor.selected(), None);
    }
}
