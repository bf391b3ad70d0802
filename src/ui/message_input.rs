//! Single-line text field rendering, used by the join form and the composer.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::text_input_state::TextInputState;

use super::styles;

/// Prompt symbol shown before the input text.
const PROMPT_SYMBOL: &str = "> ";

/// Renders an input box with the cursor placed after the typed text.
pub fn render_text_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input_state: &TextInputState,
    title: &str,
    placeholder: &str,
) {
    let line = build_input_line(input_state, placeholder);

    let paragraph = Paragraph::new(line).block(
        Block::default()
            .title(title.to_owned())
            .borders(Borders::ALL)
            .border_style(styles::active_panel_border_style()),
    );

    frame.render_widget(paragraph, area);

    // Use saturating arithmetic to prevent overflow with very long inputs
    let cursor_x = area
        .x
        .saturating_add(1)
        .saturating_add(PROMPT_SYMBOL.len() as u16)
        .saturating_add(cursor_column(input_state).min(u16::MAX as usize) as u16);
    let cursor_y = area.y.saturating_add(1);
    frame.set_cursor_position((cursor_x, cursor_y));
}

/// Display columns before the cursor.
fn cursor_column(input_state: &TextInputState) -> usize {
    let before: String = input_state
        .text()
        .chars()
        .take(input_state.cursor_position())
        .collect();
    before.width()
}

fn build_input_line(input_state: &TextInputState, placeholder: &str) -> Line<'static> {
    let prompt = Span::styled(PROMPT_SYMBOL.to_owned(), styles::input_prompt_style());

    if input_state.is_empty() {
        Line::from(vec![
            prompt,
            Span::styled(placeholder.to_owned(), styles::input_placeholder_style()),
        ])
    } else {
        Line::from(vec![
            prompt,
            Span::styled(input_state.text().to_owned(), styles::input_text_style()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn build_input_line_shows_placeholder_when_empty() {
        let state = TextInputState::with_max_length(10);
        let line = build_input_line(&state, "Your name");

        assert_eq!(text_of(&line), "> Your name");
    }

    #[test]
    fn build_input_line_shows_text_when_has_content() {
        let mut state = TextInputState::with_max_length(10);
        state.insert_char('H');
        state.insert_char('i');

        let line = build_input_line(&state, "Your name");

        assert_eq!(text_of(&line), "> Hi");
    }

    #[test]
    fn cursor_column_counts_wide_characters() {
        let mut state = TextInputState::with_max_length(10);
        state.insert_char('愛');
        state.insert_char('a');
        state.move_cursor_left();

        assert_eq!(cursor_column(&state), 2);
    }
}
