//! Style definitions for the UI components.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::notice::NoticeLevel;

// =============================================================================
// Landing styles
// =============================================================================

/// Style for the app title (bold magenta).
pub fn landing_title_style() -> Style {
    Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD)
}

pub fn landing_tagline_style() -> Style {
    Style::default().fg(Color::Gray)
}

/// Style for feature blurb headings.
pub fn feature_heading_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Style for key hints like "[Enter]".
pub fn key_hint_style() -> Style {
    Style::default().fg(Color::Cyan)
}

// =============================================================================
// Panel and input styles
// =============================================================================

pub fn active_panel_border_style() -> Style {
    Style::default().fg(Color::Magenta)
}

pub fn inactive_panel_border_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn input_prompt_style() -> Style {
    Style::default().fg(Color::Magenta)
}

pub fn input_text_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn input_placeholder_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for the "@username" room header.
pub fn room_header_style() -> Style {
    Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD)
}

// =============================================================================
// Message list styles
// =============================================================================

/// Style for message sender name (white, bold).
pub fn message_sender_style() -> Style {
    Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Style for message time in the messages panel.
pub fn message_time_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Style for message text content.
pub fn message_text_style() -> Style {
    Style::default().fg(Color::White)
}

/// Style for the viewer's own message text.
pub fn own_message_text_style() -> Style {
    Style::default().fg(Color::LightMagenta)
}

/// Style for date separator line.
pub fn date_separator_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

// =============================================================================
// Notices and status
// =============================================================================

pub fn notice_border_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Info => Style::default().fg(Color::Green),
        NoticeLevel::Error => Style::default().fg(Color::Red),
    }
}

pub fn notice_title_style(level: NoticeLevel) -> Style {
    notice_border_style(level).add_modifier(Modifier::BOLD)
}

pub fn status_style() -> Style {
    Style::default().fg(Color::DarkGray)
}
