/// Scroll margin - number of items to keep visible above/below cursor before scrolling.
const SCROLL_MARGIN: usize = 5;

/// Cursor and scroll position over the room's message list.
///
/// While `follow_tail` is set the cursor tracks the newest message, so the
/// list stays pinned to the bottom as messages arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomViewState {
    selected_index: Option<usize>,
    scroll_offset: usize,
    follow_tail: bool,
}

impl Default for RoomViewState {
    fn default() -> Self {
        Self {
            selected_index: None,
            scroll_offset: 0,
            follow_tail: true,
        }
    }
}

impl RoomViewState {
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn is_following_tail(&self) -> bool {
        self.follow_tail
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Re-anchors the cursor after the message count changed.
    pub fn sync_with_len(&mut self, len: usize) {
        if len == 0 {
            self.selected_index = None;
            return;
        }

        self.selected_index = match self.selected_index {
            _ if self.follow_tail => Some(len - 1),
            Some(idx) => Some(idx.min(len - 1)),
            None => Some(len - 1),
        };
    }

    /// Moves the cursor towards older messages.
    pub fn scroll_up(&mut self, len: usize, rows: usize) {
        if len == 0 {
            return;
        }

        let current = self.selected_index.unwrap_or(len - 1);
        self.selected_index = Some(current.saturating_sub(rows));
        self.follow_tail = false;
    }

    /// Moves the cursor towards newer messages; reaching the end resumes following.
    pub fn scroll_down(&mut self, len: usize, rows: usize) {
        if len == 0 {
            return;
        }

        let next = self
            .selected_index
            .map_or(len - 1, |idx| idx.saturating_add(rows).min(len - 1));
        self.selected_index = Some(next);
        self.follow_tail = next == len - 1;
    }

    pub fn jump_to_latest(&mut self, len: usize) {
        self.follow_tail = true;
        self.sync_with_len(len);
    }

    /// Keeps the cursor visible with SCROLL_MARGIN items above/below.
    ///
    /// `element_index` is the visual index in the list (accounting for date separators).
    /// `viewport_height` is the number of visible rows in the list area.
    pub fn update_scroll_offset(&mut self, element_index: usize, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }

        let effective_margin = SCROLL_MARGIN.min(viewport_height / 2);

        if element_index < self.scroll_offset + effective_margin {
            self.scroll_offset = element_index.saturating_sub(effective_margin);
        }

        let visible_bottom = self.scroll_offset + viewport_height;
        if element_index + effective_margin >= visible_bottom {
            self.scroll_offset =
                (element_index + effective_margin + 1).saturating_sub(viewport_height);
        }
    }
}
