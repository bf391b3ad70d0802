use anyhow::Result;

use crate::domain::{
    events::{AppEvent, ConnectivityStatus},
    message::{Message, NewMessage},
    message_feed::MessageFeed,
    notice::{Notice, NoticeBoard},
    shell_state::ShellState,
    sync::{StoreError, SubscriptionEvent},
};

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn state(&self) -> &ShellState;
    fn feed(&self) -> &MessageFeed;
    /// Borrows the shell state for rendering alongside the message list.
    fn view_mut(&mut self) -> (&mut ShellState, &MessageFeed, ConnectivityStatus);
    fn connectivity(&self) -> ConnectivityStatus;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}

/// Receives the outcome of one store operation. May be invoked on any thread.
pub type Completion<T> = Box<dyn FnOnce(Result<T, StoreError>) + Send + 'static>;

/// Receives every event of one live subscription. May be invoked on any thread.
pub type SubscriptionHandler = Box<dyn Fn(SubscriptionEvent) + Send + Sync + 'static>;

/// The hosted message table and its insert feed.
///
/// Operations return immediately; results arrive through the supplied
/// callbacks once the store answers.
pub trait MessageStore {
    /// All messages, requested in `created_at` ascending order.
    fn fetch_ordered(&self, done: Completion<Vec<Message>>);

    /// Inserts a record; the store assigns `id` and `created_at` and hands
    /// back the stored row.
    fn insert(&self, record: NewMessage, done: Completion<Message>);

    /// Opens a channel delivering each newly inserted row.
    fn subscribe_inserts(&self, handler: SubscriptionHandler) -> Box<dyn InsertSubscription>;
}

impl<T: MessageStore + ?Sized> MessageStore for &T {
    fn fetch_ordered(&self, done: Completion<Vec<Message>>) {
        (*self).fetch_ordered(done)
    }

    fn insert(&self, record: NewMessage, done: Completion<Message>) {
        (*self).insert(record, done)
    }

    fn subscribe_inserts(&self, handler: SubscriptionHandler) -> Box<dyn InsertSubscription> {
        (*self).subscribe_inserts(handler)
    }
}

/// Handle of a live insert channel.
pub trait InsertSubscription: Send {
    /// Releases the channel. Calling it again is a no-op.
    fn unsubscribe(&mut self);
}

/// Where user-visible failures and greetings end up.
pub trait NotificationSink {
    fn notify(&mut self, notice: Notice);
}

impl NotificationSink for NoticeBoard {
    fn notify(&mut self, notice: Notice) {
        self.post(notice);
    }
}

#[cfg(test)]
impl NotificationSink for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}
