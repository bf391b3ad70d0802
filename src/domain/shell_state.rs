use std::time::Duration;

use super::{
    notice::NoticeBoard,
    room_view_state::RoomViewState,
    session::SessionGate,
    text_input_state::{TextInputState, MESSAGE_MAX_LENGTH, USERNAME_MAX_LENGTH},
};

/// Top-level screens. The room shows the join form or the chat view
/// depending on the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Landing,
    Room,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    screen: Screen,
    session: SessionGate,
    name_input: TextInputState,
    message_input: TextInputState,
    room_view: RoomViewState,
    notices: NoticeBoard,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new(NoticeBoard::default())
    }
}

impl ShellState {
    pub fn new(notices: NoticeBoard) -> Self {
        Self {
            running: true,
            screen: Screen::Landing,
            session: SessionGate::default(),
            name_input: TextInputState::with_max_length(USERNAME_MAX_LENGTH),
            message_input: TextInputState::with_max_length(MESSAGE_MAX_LENGTH),
            room_view: RoomViewState::default(),
            notices,
        }
    }

    pub fn with_notice_ttl(ttl: Duration) -> Self {
        Self::new(NoticeBoard::new(ttl))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionGate {
        &mut self.session
    }

    pub fn name_input(&self) -> &TextInputState {
        &self.name_input
    }

    pub fn name_input_mut(&mut self) -> &mut TextInputState {
        &mut self.name_input
    }

    pub fn message_input(&self) -> &TextInputState {
        &self.message_input
    }

    pub fn message_input_mut(&mut self) -> &mut TextInputState {
        &mut self.message_input
    }

    pub fn room_view(&self) -> &RoomViewState {
        &self.room_view
    }

    pub fn room_view_mut(&mut self) -> &mut RoomViewState {
        &mut self.room_view
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    /// The text field that currently receives typed characters.
    pub fn active_input_mut(&mut self) -> Option<&mut TextInputState> {
        match (self.screen, self.session.is_joined()) {
            (Screen::Landing, _) => None,
            (Screen::Room, false) => Some(&mut self.name_input),
            (Screen::Room, true) => Some(&mut self.message_input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_on_landing_screen() {
        let state = ShellState::default();

        assert!(state.is_running());
        assert_eq!(state.screen(), Screen::Landing);
        assert!(!state.session().is_joined());
    }

    #[test]
    fn landing_screen_has_no_active_input() {
        let mut state = ShellState::default();

        assert!(state.active_input_mut().is_none());
    }

    #[test]
    fn room_screen_routes_typing_by_session_state() {
        let mut state = ShellState::default();
        state.set_screen(Screen::Room);

        state
            .active_input_mut()
            .expect("join form should take input")
            .insert_char('A');
        assert_eq!(state.name_input().text(), "A");

        state
            .session_mut()
            .join("Alice")
            .expect("join should succeed");
        state
            .active_input_mut()
            .expect("composer should take input")
            .insert_char('h');
        assert_eq!(state.message_input().text(), "h");
        assert_eq!(state.name_input().text(), "A");
    }

    #[test]
    fn stop_ends_the_loop() {
        let mut state = ShellState::default();

        state.stop();

        assert!(!state.is_running());
    }
}
