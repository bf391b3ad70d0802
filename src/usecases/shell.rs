use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

use anyhow::Result;

use crate::domain::{
    events::{AppEvent, ConnectivityStatus, KeyInput},
    message_feed::MessageFeed,
    notice::Notice,
    session::JoinError,
    shell_state::{Screen, ShellState},
    sync::SyncEvent,
};

use super::{
    contracts::{MessageStore, ShellOrchestrator},
    message_sync::{MessageSync, SyncOutcome},
    send_message::SendMessageError,
};

/// Rows moved by PageUp/PageDown in the message list.
const PAGE_ROWS: usize = 10;

const WELCOME_TITLE: &str = "Welcome!";

pub struct DefaultShellOrchestrator<S: MessageStore> {
    state: ShellState,
    sync: MessageSync<S>,
}

impl<S: MessageStore> DefaultShellOrchestrator<S> {
    pub fn new(state: ShellState, store: S, sync_events: Sender<SyncEvent>) -> Self {
        Self {
            state,
            sync: MessageSync::new(store, sync_events),
        }
    }

    /// Bounds the wait for the live channel before history loads without it.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.sync.set_ready_timeout(timeout);
        self
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl {
            match key.key.as_str() {
                "c" => self.state.stop(),
                "d" => {
                    self.state.notices_mut().dismiss_latest();
                }
                "end" if self.state.session().is_joined() => {
                    let len = self.sync.messages().len();
                    self.state.room_view_mut().jump_to_latest(len);
                }
                _ => {}
            }
            return;
        }

        match (self.state.screen(), self.state.session().is_joined()) {
            (Screen::Landing, _) => match key.key.as_str() {
                "enter" => self.open_room(),
                "q" => self.state.stop(),
                _ => {}
            },
            (Screen::Room, false) => match key.key.as_str() {
                "enter" => self.join(),
                "esc" => self.state.set_screen(Screen::Landing),
                _ => self.edit_active_input(&key),
            },
            (Screen::Room, true) => self.handle_chat_key(&key),
        }
    }

    fn handle_chat_key(&mut self, key: &KeyInput) {
        let len = self.sync.messages().len();
        match key.key.as_str() {
            "enter" => self.send(),
            "esc" => self.leave(),
            "up" => self.state.room_view_mut().scroll_up(len, 1),
            "down" => self.state.room_view_mut().scroll_down(len, 1),
            "pageup" => self.state.room_view_mut().scroll_up(len, PAGE_ROWS),
            "pagedown" => self.state.room_view_mut().scroll_down(len, PAGE_ROWS),
            _ => self.edit_active_input(key),
        }
    }

    fn edit_active_input(&mut self, key: &KeyInput) {
        let Some(input) = self.state.active_input_mut() else {
            return;
        };

        match key.key.as_str() {
            "backspace" => input.delete_char_before(),
            "delete" => input.delete_char_at(),
            "left" => input.move_cursor_left(),
            "right" => input.move_cursor_right(),
            "home" => input.move_cursor_home(),
            "end" => input.move_cursor_end(),
            _ => {
                if let Some(ch) = key.as_char() {
                    input.insert_char(ch);
                }
            }
        }
    }

    fn open_room(&mut self) {
        self.state.set_screen(Screen::Room);
        tracing::debug!("room opened");
    }

    fn join(&mut self) {
        let name = self.state.name_input().text().to_owned();
        let username = match self.state.session_mut().join(&name) {
            Ok(username) => username.to_owned(),
            Err(JoinError::EmptyName) => {
                tracing::debug!("join ignored: empty name");
                return;
            }
            Err(JoinError::AlreadyJoined) => {
                tracing::warn!("join ignored: already joined");
                return;
            }
        };

        tracing::info!(username = %username, "joined the room");
        self.state.notices_mut().post(Notice::info(
            WELCOME_TITLE,
            format!("You joined as {username}"),
        ));
        self.state.message_input_mut().clear();
        self.state.room_view_mut().reset();
        self.sync.start();
    }

    fn leave(&mut self) {
        let Some(username) = self.state.session_mut().leave() else {
            return;
        };

        self.sync.stop();
        self.state.name_input_mut().set_text(&username);
        self.state.message_input_mut().clear();
        self.state.room_view_mut().reset();
        tracing::info!(username = %username, "left the room");
    }

    fn send(&mut self) {
        let Some(username) = self.state.session().username().map(str::to_owned) else {
            return;
        };
        if self.state.message_input().is_blank() {
            return;
        }
        let content = self.state.message_input().text().to_owned();

        match self.sync.send(&username, &content) {
            Ok(()) => tracing::debug!(chars = content.chars().count(), "message submitted"),
            Err(SendMessageError::EmptyMessage) => {}
            Err(error) => tracing::warn!(error = ?error, "message not submitted"),
        }
    }

    fn handle_sync(&mut self, event: SyncEvent) {
        let outcome = self.sync.apply(event, self.state.notices_mut());
        self.settle(outcome);
    }

    fn handle_tick(&mut self) {
        let now = Instant::now();
        self.state.notices_mut().expire(now);

        let outcome = self.sync.expire_pending_ready(now, self.state.notices_mut());
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: SyncOutcome) {
        if let SyncOutcome::DraftDelivered { content } = outcome {
            let input = self.state.message_input_mut();
            if input.text().trim() == content {
                input.clear();
            }
        }

        let len = self.sync.messages().len();
        self.state.room_view_mut().sync_with_len(len);
    }
}

impl<S: MessageStore> ShellOrchestrator for DefaultShellOrchestrator<S> {
    fn state(&self) -> &ShellState {
        &self.state
    }

    fn feed(&self) -> &MessageFeed {
        self.sync.feed()
    }

    fn view_mut(&mut self) -> (&mut ShellState, &MessageFeed, ConnectivityStatus) {
        let connectivity = self.sync.connectivity();
        (&mut self.state, self.sync.feed(), connectivity)
    }

    fn connectivity(&self) -> ConnectivityStatus {
        self.sync.connectivity()
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => self.handle_tick(),
            AppEvent::QuitRequested => self.state.stop(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::Sync(event) => self.handle_sync(event),
        }

        Ok(())
    }
}
