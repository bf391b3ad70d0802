use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::domain::{
    events::ConnectivityStatus,
    message_feed::{FeedUiState, MessageFeed},
    notice::Notice,
    shell_state::{Screen, ShellState},
};

use super::message_input::render_text_input;
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index,
};
use super::styles;

const APP_TITLE: &str = "LoveChat";
const TAGLINE: &str = "Connect with hearts around the world in our romantic chat room";
const FEATURES: [(&str, &str); 3] = [
    ("Find Connections", "Meet new people and make meaningful connections"),
    ("Real-time Chat", "Instant messaging with everyone in the room"),
    ("Share Love", "Express yourself in a welcoming community"),
];

const NOTICE_WIDTH: u16 = 40;
const NOTICE_HEIGHT: u16 = 4;

pub fn render(
    frame: &mut Frame<'_>,
    state: &mut ShellState,
    feed: &MessageFeed,
    connectivity: ConnectivityStatus,
) {
    let [content_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());

    match (state.screen(), state.session().is_joined()) {
        (Screen::Landing, _) => render_landing(frame, content_area),
        (Screen::Room, false) => render_join_form(frame, content_area, state),
        (Screen::Room, true) => render_room(frame, content_area, state, feed),
    }

    let status = Paragraph::new(status_line(state, connectivity)).style(styles::status_style());
    frame.render_widget(status, status_area);

    render_notices(frame, content_area, state.notices().visible());
}

fn render_landing(frame: &mut Frame<'_>, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled("♥", styles::landing_title_style())),
        Line::from(Span::styled(APP_TITLE, styles::landing_title_style())),
        Line::default(),
        Line::from(Span::styled(TAGLINE, styles::landing_tagline_style())),
        Line::default(),
        Line::from(vec![
            Span::styled("[Enter] ", styles::key_hint_style()),
            Span::raw("Public Chat Room"),
            Span::styled("    [q] ", styles::key_hint_style()),
            Span::raw("Quit"),
        ]),
        Line::default(),
    ];

    for (heading, blurb) in FEATURES {
        lines.push(Line::from(Span::styled(heading, styles::feature_heading_style())));
        lines.push(Line::from(Span::styled(blurb, styles::landing_tagline_style())));
        lines.push(Line::default());
    }

    let height = lines.len() as u16;
    let [centered] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);

    let landing = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(landing, centered);
}

fn render_join_form(frame: &mut Frame<'_>, area: Rect, state: &ShellState) {
    let [form_area] = Layout::horizontal([Constraint::Max(50)])
        .flex(Flex::Center)
        .areas(area);
    let [heading_area, input_area, hint_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .flex(Flex::Center)
    .areas(form_area);

    let heading = Paragraph::new(vec![
        Line::from(Span::styled("Join Chat", styles::landing_title_style())),
        Line::from(Span::styled(
            "Enter your name to start chatting",
            styles::landing_tagline_style(),
        )),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(heading, heading_area);

    render_text_input(frame, input_area, state.name_input(), " Name ", "Your name...");

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("[Enter] ", styles::key_hint_style()),
        Span::raw("Join Chat  "),
        Span::styled("[Esc] ", styles::key_hint_style()),
        Span::raw("Back to Home"),
    ]))
    .alignment(Alignment::Center);
    frame.render_widget(hint, hint_area);
}

fn render_room(frame: &mut Frame<'_>, area: Rect, state: &mut ShellState, feed: &MessageFeed) {
    let [header_area, messages_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(room_header(state)), header_area);
    render_messages_panel(frame, messages_area, state, feed);
    render_text_input(
        frame,
        input_area,
        state.message_input(),
        " Message ",
        "Type a message...",
    );
}

fn room_header(state: &ShellState) -> Line<'static> {
    let username = state.session().username().unwrap_or_default();
    Line::from(vec![
        Span::styled("Chat Room", styles::feature_heading_style()),
        Span::raw("  "),
        Span::styled(format!("@{username}"), styles::room_header_style()),
    ])
}

fn render_messages_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &mut ShellState,
    feed: &MessageFeed,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::inactive_panel_border_style());

    let placeholder = match feed.ui_state() {
        FeedUiState::Loading => Some("Loading messages..."),
        FeedUiState::Error if feed.is_empty() => Some("Messages are unavailable right now."),
        _ if feed.is_empty() => Some("No messages yet. Say hello!"),
        _ => None,
    };

    if let Some(text) = placeholder {
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let elements = build_message_list_elements(feed.messages(), state.session().username());
    let items: Vec<ListItem<'static>> = elements
        .iter()
        .map(|element| element_to_list_item(element, inner_width))
        .collect();

    // Calculate viewport height (area height minus borders)
    let viewport_height = area.height.saturating_sub(2) as usize;

    // Map message index to element index (accounting for date separators)
    let element_index = state
        .room_view()
        .selected_index()
        .and_then(|msg_idx| message_index_to_element_index(&elements, msg_idx));

    if let Some(idx) = element_index {
        state
            .room_view_mut()
            .update_scroll_offset(idx, viewport_height);
    }

    let following = state.room_view().is_following_tail();
    let list = List::new(items).block(block).highlight_style(if following {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    });

    let mut list_state = ListState::default();
    list_state.select(element_index);
    *list_state.offset_mut() = state.room_view().scroll_offset();
    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Stacks notices in the top-right corner, newest on top.
fn render_notices<'a>(frame: &mut Frame<'_>, area: Rect, notices: impl Iterator<Item = &'a Notice>) {
    let width = NOTICE_WIDTH.min(area.width);
    let x = area.x + area.width.saturating_sub(width);

    for (slot, notice) in notices.enumerate() {
        let y = area.y + slot as u16 * NOTICE_HEIGHT;
        if y + NOTICE_HEIGHT > area.y + area.height {
            break;
        }

        let notice_area = Rect::new(x, y, width, NOTICE_HEIGHT);
        let panel = Paragraph::new(notice.description.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(styles::notice_border_style(notice.level))
                    .title(Span::styled(
                        format!(" {} ", notice.title),
                        styles::notice_title_style(notice.level),
                    )),
            );
        frame.render_widget(Clear, notice_area);
        frame.render_widget(panel, notice_area);
    }
}

fn status_line(state: &ShellState, connectivity: ConnectivityStatus) -> String {
    let nav_hint = match (state.screen(), state.session().is_joined()) {
        (Screen::Landing, _) => "Enter: open chat room | q: quit",
        (Screen::Room, false) => "Enter: join | Esc: home | Ctrl+C: quit",
        (Screen::Room, true) => {
            "Enter: send | Esc: leave | ↑/↓ PgUp/PgDn: scroll | Ctrl+End: latest | Ctrl+D: dismiss | Ctrl+C: quit"
        }
    };
    format!("live: {} | {nav_hint}", connectivity.as_label())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::domain::message::{Message, MessageId};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn draw(state: &mut ShellState, feed: &MessageFeed) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("test terminal");
        terminal
            .draw(|frame| render(frame, state, feed, ConnectivityStatus::Connected))
            .expect("draw must succeed");
        buffer_text(&terminal)
    }

    fn joined_state(name: &str) -> ShellState {
        let mut state = ShellState::default();
        state.set_screen(Screen::Room);
        state.session_mut().join(name).expect("join must succeed");
        state
    }

    #[test]
    fn status_line_reports_live_channel_and_hints() {
        let state = ShellState::default();

        let line = status_line(&state, ConnectivityStatus::Disconnected);

        assert!(line.contains("live: disconnected"));
        assert!(line.contains("q: quit"));
    }

    #[test]
    fn landing_shows_title_and_room_entry() {
        let text = draw(&mut ShellState::default(), &MessageFeed::default());

        assert!(text.contains(APP_TITLE));
        assert!(text.contains("Public Chat Room"));
        assert!(text.contains("Real-time Chat"));
    }

    #[test]
    fn join_form_shows_name_prompt() {
        let mut state = ShellState::default();
        state.set_screen(Screen::Room);

        let text = draw(&mut state, &MessageFeed::default());

        assert!(text.contains("Join Chat"));
        assert!(text.contains("Your name..."));
    }

    #[test]
    fn room_shows_username_and_messages() {
        let mut state = joined_state("Alice");
        let mut feed = MessageFeed::default();
        feed.replace_with_history(vec![Message {
            id: MessageId::new("1"),
            username: "Bob".to_owned(),
            content: "hello there".to_owned(),
            created_at: Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).unwrap(),
        }]);
        state.room_view_mut().sync_with_len(feed.len());

        let text = draw(&mut state, &feed);

        assert!(text.contains("Chat Room  @Alice"));
        assert!(text.contains("Bob:"));
        assert!(text.contains("hello there"));
    }

    #[test]
    fn room_shows_loading_placeholder() {
        let mut state = joined_state("Alice");
        let mut feed = MessageFeed::default();
        feed.set_loading();

        let text = draw(&mut state, &feed);

        assert!(text.contains("Loading messages..."));
    }

    #[test]
    fn notices_are_drawn_over_the_screen() {
        let mut state = ShellState::default();
        state
            .notices_mut()
            .post(Notice::error("Failed to load messages"));

        let text = draw(&mut state, &MessageFeed::default());

        assert!(text.contains("Error"));
        assert!(text.contains("Failed to load messages"));
    }
}
