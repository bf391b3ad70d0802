//! Message list rendering logic.
//!
//! Handles visual formatting of messages including:
//! - Multi-line message display (time + sender on first line, text below)
//! - Sender grouping (consecutive messages from same sender show name only once)
//! - Date separators between messages from different days
//! - Own messages aligned to the right edge

use chrono::{Local, NaiveDate};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::ListItem,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::message::Message;

use super::styles;

const OWN_SENDER_LABEL: &str = "You";

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    /// A message with optional sender display.
    Message {
        time: String,
        sender: Option<String>,
        content: String,
        own: bool,
    },
}

/// Builds a list of visual elements from messages.
///
/// Groups consecutive messages from the same sender and inserts date separators.
/// `viewer` is the joined username; its messages are marked as own.
pub fn build_message_list_elements(
    messages: &[Message],
    viewer: Option<&str>,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<&str> = None;

    for message in messages {
        let local = message.created_at.with_timezone(&Local);
        let msg_date = local.date_naive();

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
            prev_sender = None;
        }

        let own = viewer.is_some_and(|name| message.is_from(name));
        let sender_name = if own {
            OWN_SENDER_LABEL
        } else {
            message.username.as_str()
        };

        let sender = (prev_sender != Some(sender_name)).then(|| sender_name.to_owned());

        elements.push(MessageListElement::Message {
            time: local.format("%H:%M").to_string(),
            sender,
            content: message.content.clone(),
            own,
        });

        prev_date = Some(msg_date);
        prev_sender = Some(sender_name);
    }

    elements
}

/// Converts a message index to the corresponding element index in the list.
///
/// Since the element list contains both messages and date separators,
/// this function finds the element index for a given message index.
/// Returns `None` if the message index is out of range.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message { .. }))
        .nth(message_index)
        .map(|(elem_idx, _)| elem_idx)
}

/// Converts a list element to a ListItem. `width` is the inner list width,
/// used to push own messages against the right edge.
pub fn element_to_list_item(element: &MessageListElement, width: usize) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message {
            time,
            sender,
            content,
            own: false,
        } => message_item(time, sender.as_deref(), content),
        MessageListElement::Message {
            time,
            sender,
            content,
            own: true,
        } => own_message_item(time, sender.is_some(), content, width),
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let separator = format!("——— {} ———", date);
    let line = Line::from(vec![Span::styled(
        separator,
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line, Line::default()])
}

fn message_item(time: &str, sender: Option<&str>, content: &str) -> ListItem<'static> {
    let mut lines = Vec::new();
    let indent = "      "; // 6 spaces to align with time column
    let mut content_lines = content.lines();

    match sender {
        Some(name) => {
            lines.push(Line::from(vec![
                Span::styled(format!("{:>5} ", time), styles::message_time_style()),
                Span::styled(format!("{}:", name), styles::message_sender_style()),
            ]));
        }
        None => {
            // Grouped message: time + first line of content on same row
            let mut spans = vec![Span::styled(
                format!("{:>5} ", time),
                styles::message_time_style(),
            )];
            if let Some(first_line) = content_lines.next() {
                spans.push(Span::styled(first_line.to_owned(), styles::message_text_style()));
            }
            lines.push(Line::from(spans));
        }
    }

    for text_line in content_lines {
        lines.push(Line::from(vec![
            Span::raw(indent.to_owned()),
            Span::styled(text_line.to_owned(), styles::message_text_style()),
        ]));
    }

    ListItem::new(lines)
}

fn own_message_item(time: &str, show_header: bool, content: &str, width: usize) -> ListItem<'static> {
    ListItem::new(own_message_lines(time, show_header, content, width))
}

fn own_message_lines(
    time: &str,
    show_header: bool,
    content: &str,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if show_header {
        lines.push(right_aligned(
            vec![
                Span::styled(format!("{}:", OWN_SENDER_LABEL), styles::message_sender_style()),
                Span::styled(format!(" {}", time), styles::message_time_style()),
            ],
            width,
        ));
    }

    for (index, text_line) in content.lines().enumerate() {
        let mut spans = vec![Span::styled(text_line.to_owned(), styles::own_message_text_style())];
        if !show_header && index == 0 {
            spans.push(Span::styled(format!(" {}", time), styles::message_time_style()));
        }
        lines.push(right_aligned(spans, width));
    }

    lines
}

/// Pads `spans` on the left so they end at `width` columns.
fn right_aligned(mut spans: Vec<Span<'static>>, width: usize) -> Line<'static> {
    let used: usize = spans.iter().map(|span| span.content.width()).sum();
    let padding = width.saturating_sub(used);
    if padding > 0 {
        spans.insert(0, Span::raw(" ".repeat(padding)));
    }
    Line::from(spans)
}

fn format_date(date: NaiveDate) -> String {
    // Format: "14 Feb 2026"
    date.format("%-d %b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::message::MessageId;

    fn msg(id: &str, sender: &str, text: &str, day: u32, hour: u32) -> Message {
        Message {
            id: MessageId::new(id),
            username: sender.to_owned(),
            content: text.to_owned(),
            created_at: Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap(),
        }
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn builds_date_separator_for_first_message() {
        let elements = build_message_list_elements(&[msg("1", "Alice", "Hello", 14, 12)], None);

        assert!(matches!(elements[0], MessageListElement::DateSeparator(_)));
        assert!(matches!(elements[1], MessageListElement::Message { .. }));
    }

    #[test]
    fn groups_consecutive_messages_from_same_sender() {
        let messages = vec![
            msg("1", "Alice", "one", 14, 12),
            msg("2", "Alice", "two", 14, 12),
            msg("3", "Bob", "three", 14, 12),
        ];

        let senders: Vec<Option<String>> = build_message_list_elements(&messages, None)
            .into_iter()
            .filter_map(|element| match element {
                MessageListElement::Message { sender, .. } => Some(sender),
                MessageListElement::DateSeparator(_) => None,
            })
            .collect();

        assert_eq!(
            senders,
            vec![Some("Alice".to_owned()), None, Some("Bob".to_owned())]
        );
    }

    #[test]
    fn inserts_date_separator_on_date_change() {
        let messages = vec![msg("1", "Alice", "one", 10, 12), msg("2", "Alice", "two", 14, 12)];

        let elements = build_message_list_elements(&messages, None);

        assert_eq!(elements.len(), 4);
        assert!(matches!(elements[2], MessageListElement::DateSeparator(_)));
        assert!(matches!(
            &elements[3],
            MessageListElement::Message { sender: Some(name), .. } if name == "Alice"
        ));
    }

    #[test]
    fn marks_viewer_messages_as_own() {
        let messages = vec![msg("1", "Alice", "mine", 14, 12), msg("2", "Bob", "theirs", 14, 12)];

        let elements = build_message_list_elements(&messages, Some("Alice"));

        assert!(matches!(
            &elements[1],
            MessageListElement::Message { own: true, sender: Some(name), .. } if name == "You"
        ));
        assert!(matches!(
            &elements[2],
            MessageListElement::Message { own: false, .. }
        ));
    }

    #[test]
    fn own_messages_end_at_the_right_edge() {
        let element = MessageListElement::Message {
            time: "10:00".to_owned(),
            sender: Some("You".to_owned()),
            content: "hi".to_owned(),
            own: true,
        };

        let item = element_to_list_item(&element, 20);
        let lines = own_message_lines("10:00", true, "hi", 20);

        assert_eq!(item.height(), 2);
        assert_eq!(line_text(&lines[0]), format!("{:>20}", "You: 10:00"));
        assert_eq!(line_text(&lines[1]), format!("{:>20}", "hi"));
    }

    #[test]
    fn grouped_own_message_carries_time_on_its_line() {
        let lines = own_message_lines("10:05", false, "again", 20);

        assert_eq!(lines.len(), 1);
        assert_eq!(line_text(&lines[0]), format!("{:>20}", "again 10:05"));
    }

    #[test]
    fn right_alignment_counts_display_width() {
        let line = right_aligned(vec![Span::raw("日本")], 6);

        assert_eq!(line_text(&line), "  日本");
    }

    #[test]
    fn message_index_to_element_index_accounts_for_date_separators() {
        let messages = vec![msg("1", "Alice", "one", 10, 12), msg("2", "Bob", "two", 14, 12)];
        let elements = build_message_list_elements(&messages, None);

        assert_eq!(message_index_to_element_index(&elements, 0), Some(1));
        assert_eq!(message_index_to_element_index(&elements, 1), Some(3));
        assert_eq!(message_index_to_element_index(&elements, 2), None);
        assert_eq!(message_index_to_element_index(&[], 0), None);
    }

    #[test]
    fn format_date_produces_correct_format() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();

        assert_eq!(format_date(date), "14 Feb 2026");
    }
}
