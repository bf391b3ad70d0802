use std::collections::HashSet;

use super::message::{Message, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// The locally-ordered view of the room's messages.
///
/// Every insertion path checks `id` so a message is never listed twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFeed {
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    ui_state: FeedUiState,
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            ids: HashSet::new(),
            ui_state: FeedUiState::Empty,
        }
    }
}

impl MessageFeed {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn ui_state(&self) -> FeedUiState {
        self.ui_state
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn set_loading(&mut self) {
        self.clear();
        self.ui_state = FeedUiState::Loading;
    }

    /// Replaces the list with `history`, sorted by `created_at` ascending.
    ///
    /// The sort is stable, so rows sharing a timestamp keep the store's order.
    /// Duplicate ids inside `history` keep their first occurrence.
    pub fn replace_with_history(&mut self, mut history: Vec<Message>) {
        history.sort_by(|left, right| left.created_at.cmp(&right.created_at));

        self.clear();
        for message in history {
            self.append(message);
        }
        self.ui_state = FeedUiState::Ready;
    }

    /// History could not be loaded; live messages may still be appended.
    pub fn set_error(&mut self) {
        self.clear();
        self.ui_state = FeedUiState::Error;
    }

    /// Appends without re-sorting. Returns false when the id is already listed.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }

        self.messages.push(message);
        true
    }

    pub fn reset(&mut self) {
        self.clear();
        self.ui_state = FeedUiState::Empty;
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(id: &str, minute: u32) -> Message {
        Message {
            id: MessageId::new(id),
            username: "Alice".to_owned(),
            content: format!("message {id}"),
            created_at: Utc.with_ymd_and_hms(2026, 2, 14, 10, minute, 0).unwrap(),
        }
    }

    fn ids(feed: &MessageFeed) -> Vec<&str> {
        feed.messages().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn default_feed_is_empty() {
        let feed = MessageFeed::default();

        assert_eq!(feed.ui_state(), FeedUiState::Empty);
        assert!(feed.is_empty());
    }

    #[test]
    fn history_is_sorted_for_any_row_permutation() {
        let rows = [message("a", 1), message("b", 2), message("c", 3)];
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in permutations {
            let mut feed = MessageFeed::default();
            feed.replace_with_history(order.iter().map(|&i| rows[i].clone()).collect());

            assert_eq!(ids(&feed), vec!["a", "b", "c"], "failed for {order:?}");
            assert!(feed
                .messages()
                .windows(2)
                .all(|pair| pair[0].created_at <= pair[1].created_at));
        }
    }

    #[test]
    fn history_sort_keeps_store_order_for_equal_timestamps() {
        let mut feed = MessageFeed::default();

        feed.replace_with_history(vec![message("second", 5), message("first", 5)]);

        assert_eq!(ids(&feed), vec!["second", "first"]);
    }

    #[test]
    fn history_drops_duplicate_ids() {
        let mut feed = MessageFeed::default();

        feed.replace_with_history(vec![message("a", 1), message("a", 1), message("b", 2)]);

        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn replacing_history_discards_previous_messages() {
        let mut feed = MessageFeed::default();
        feed.replace_with_history(vec![message("old", 1)]);

        feed.replace_with_history(vec![message("new", 2)]);

        assert_eq!(ids(&feed), vec!["new"]);
        assert!(!feed.contains(&MessageId::new("old")));
    }

    #[test]
    fn append_does_not_resort() {
        let mut feed = MessageFeed::default();
        feed.replace_with_history(vec![message("late", 9)]);

        assert!(feed.append(message("early", 1)));

        assert_eq!(ids(&feed), vec!["late", "early"]);
    }

    #[test]
    fn append_rejects_known_ids() {
        let mut feed = MessageFeed::default();
        feed.replace_with_history(vec![message("a", 1)]);

        assert!(!feed.append(message("a", 1)));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn error_state_keeps_accepting_live_messages() {
        let mut feed = MessageFeed::default();
        feed.set_loading();

        feed.set_error();
        feed.append(message("live", 3));

        assert_eq!(feed.ui_state(), FeedUiState::Error);
        assert_eq!(ids(&feed), vec!["live"]);
    }

    #[test]
    fn reset_clears_messages_and_ids() {
        let mut feed = MessageFeed::default();
        feed.replace_with_history(vec![message("a", 1)]);

        feed.reset();

        assert!(feed.is_empty());
        assert!(!feed.contains(&MessageId::new("a")));
        assert_eq!(feed.ui_state(), FeedUiState::Empty);
    }
}
