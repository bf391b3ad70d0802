//! Keeps the room's message list in step with the store while joined.
//!
//! Entering the room opens the insert channel first and buffers what it
//! delivers; history is requested once the channel answers (or the wait for it
//! times out), replaces the list
//! wholesale, and the buffer is merged after it by `id`. From then on each
//! insert is appended as it arrives. Every store answer is posted back to the
//! UI loop as a [`SyncEvent`] tagged with the epoch that issued it, and
//! answers from an earlier epoch are dropped.

use std::{
    sync::mpsc::Sender,
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::domain::{
    events::ConnectivityStatus,
    message::{Message, MessageId},
    message_feed::MessageFeed,
    notice::Notice,
    sync::{StoreError, SubscriptionEvent, SyncEpoch, SyncEvent},
};

use super::{
    contracts::{InsertSubscription, MessageStore, NotificationSink},
    send_message::{prepare_message, SendMessageCommand, SendMessageError},
};

const HISTORY_LOAD_FAILED_NOTICE: &str = "Failed to load messages";
const SEND_FAILED_NOTICE: &str = "Failed to send message";
const LIVE_UNAVAILABLE_NOTICE: &str = "Live updates are unavailable";
const LIVE_DISCONNECTED_NOTICE: &str = "Live updates disconnected";

/// How long the channel may stay unanswered before history loads without it.
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_TIMED_OUT: &str = "join timed out";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to load message history: {0}")]
    HistoryLoadFailed(#[source] StoreError),
    #[error("failed to send message: {0}")]
    SendFailed(#[source] StoreError),
    #[error("live insert channel failed: {0}")]
    LiveChannelFailed(#[source] StoreError),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::HistoryLoadFailed(_) => "SYNC_HISTORY_LOAD_FAILED",
            Self::SendFailed(_) => "SYNC_SEND_FAILED",
            Self::LiveChannelFailed(_) => "SYNC_LIVE_CHANNEL_FAILED",
        }
    }

    fn notice(&self) -> Notice {
        match self {
            Self::HistoryLoadFailed(_) => Notice::error(HISTORY_LOAD_FAILED_NOTICE),
            Self::SendFailed(_) => Notice::error(SEND_FAILED_NOTICE),
            Self::LiveChannelFailed(_) => Notice::error(LIVE_UNAVAILABLE_NOTICE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not joined; everything that arrives is stale.
    Idle,
    /// Waiting for the insert channel to be accepted. Inserts are buffered.
    Subscribing,
    /// History requested. Inserts are buffered.
    LoadingHistory,
    /// Inserts are appended as they arrive.
    Live,
}

/// What the shell should do after an event was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    FeedChanged,
    /// A sent message made it back; the composer may drop `content`.
    DraftDelivered { content: String },
    /// The insert failed; the composer keeps its text for a retry.
    DraftKept,
}

pub struct MessageSync<S: MessageStore> {
    store: S,
    events: Sender<SyncEvent>,
    epoch: SyncEpoch,
    phase: SyncPhase,
    feed: MessageFeed,
    buffered: Vec<Message>,
    subscription: Option<Box<dyn InsertSubscription>>,
    ready_timeout: Duration,
    ready_deadline: Option<Instant>,
    /// Stored but not yet echoed, oldest first.
    pending_echoes: Vec<(MessageId, String)>,
    connectivity: ConnectivityStatus,
}

impl<S: MessageStore> MessageSync<S> {
    pub fn new(store: S, events: Sender<SyncEvent>) -> Self {
        Self {
            store,
            events,
            epoch: 0,
            phase: SyncPhase::Idle,
            feed: MessageFeed::default(),
            buffered: Vec::new(),
            subscription: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            ready_deadline: None,
            pending_echoes: Vec::new(),
            connectivity: ConnectivityStatus::Offline,
        }
    }

    pub fn set_ready_timeout(&mut self, timeout: Duration) {
        self.ready_timeout = timeout;
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn feed(&self) -> &MessageFeed {
        &self.feed
    }

    pub fn messages(&self) -> &[Message] {
        self.feed.messages()
    }

    pub fn connectivity(&self) -> ConnectivityStatus {
        self.connectivity
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn has_live_channel(&self) -> bool {
        self.subscription.is_some()
    }

    /// Entering the room: one channel, then one history load once it is ready.
    pub fn start(&mut self) {
        self.unsubscribe();
        self.epoch += 1;
        self.buffered.clear();
        self.pending_echoes.clear();
        self.feed.set_loading();

        tracing::info!(epoch = self.epoch, "message sync starting");
        self.subscribe();
    }

    /// Leaving the room: releases the channel and makes in-flight answers stale.
    pub fn stop(&mut self) {
        self.unsubscribe();
        self.epoch += 1;
        self.phase = SyncPhase::Idle;
        self.feed.reset();
        self.buffered.clear();
        self.pending_echoes.clear();
        self.connectivity = ConnectivityStatus::Offline;

        tracing::info!(epoch = self.epoch, "message sync stopped");
    }

    /// Opens the insert channel. History follows once the store accepts it.
    pub fn subscribe(&mut self) {
        self.unsubscribe();
        self.phase = SyncPhase::Subscribing;
        self.connectivity = ConnectivityStatus::Connecting;

        let epoch = self.epoch;
        let events = self.events.clone();
        let subscription = self.store.subscribe_inserts(Box::new(move |event| {
            if events
                .send(SyncEvent::Subscription { epoch, event })
                .is_err()
            {
                tracing::debug!(epoch, "sync event receiver gone; dropping subscription event");
            }
        }));

        self.subscription = Some(subscription);
        self.ready_deadline = Some(Instant::now() + self.ready_timeout);
        tracing::debug!(epoch, "insert subscription requested");
    }

    pub fn load_history(&mut self) {
        self.phase = SyncPhase::LoadingHistory;

        let epoch = self.epoch;
        let events = self.events.clone();
        self.store.fetch_ordered(Box::new(move |result| {
            if events
                .send(SyncEvent::HistoryLoaded { epoch, result })
                .is_err()
            {
                tracing::debug!(epoch, "sync event receiver gone; dropping history");
            }
        }));

        tracing::debug!(epoch, "message history requested");
    }

    /// Releases the insert channel, if any.
    pub fn unsubscribe(&mut self) {
        self.ready_deadline = None;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!(epoch = self.epoch, "insert subscription released");
        }
    }

    /// Posts `content` under `username`. The list is left alone; the message
    /// shows up when the channel echoes it.
    pub fn send(&mut self, username: &str, content: &str) -> Result<(), SendMessageError> {
        if self.phase == SyncPhase::Idle {
            return Err(SendMessageError::NotJoined);
        }

        let record = prepare_message(SendMessageCommand {
            username: username.to_owned(),
            content: content.to_owned(),
        })?;

        let epoch = self.epoch;
        let events = self.events.clone();
        self.store.insert(
            record,
            Box::new(move |result| {
                if events
                    .send(SyncEvent::SendCompleted { epoch, result })
                    .is_err()
                {
                    tracing::debug!(epoch, "sync event receiver gone; dropping send result");
                }
            }),
        );

        Ok(())
    }

    /// Gives up on a channel that was never answered, so history still loads.
    pub fn expire_pending_ready(
        &mut self,
        now: Instant,
        sink: &mut dyn NotificationSink,
    ) -> SyncOutcome {
        let expired = self.phase == SyncPhase::Subscribing
            && self.ready_deadline.is_some_and(|deadline| now >= deadline);
        if !expired {
            return SyncOutcome::Unchanged;
        }

        tracing::warn!(
            epoch = self.epoch,
            timeout_ms = self.ready_timeout.as_millis() as u64,
            "insert subscription never answered"
        );
        let timed_out = StoreError::Unavailable(READY_TIMED_OUT.to_owned());
        self.apply_subscription_event(SubscriptionEvent::Ready(Err(timed_out)), sink)
    }

    pub fn apply(&mut self, event: SyncEvent, sink: &mut dyn NotificationSink) -> SyncOutcome {
        if self.phase == SyncPhase::Idle || event.epoch() != self.epoch {
            tracing::debug!(
                event_epoch = event.epoch(),
                current_epoch = self.epoch,
                "dropping stale sync event"
            );
            return SyncOutcome::Unchanged;
        }

        match event {
            SyncEvent::Subscription { event, .. } => self.apply_subscription_event(event, sink),
            SyncEvent::HistoryLoaded { result, .. } => self.apply_history(result, sink),
            SyncEvent::SendCompleted { result, .. } => self.apply_send_result(result, sink),
        }
    }

    fn apply_subscription_event(
        &mut self,
        event: SubscriptionEvent,
        sink: &mut dyn NotificationSink,
    ) -> SyncOutcome {
        if self.subscription.is_none() && !matches!(event, SubscriptionEvent::Inserted(_)) {
            tracing::debug!(event = ?event, "ignoring status of a released channel");
            return SyncOutcome::Unchanged;
        }
        self.ready_deadline = None;

        match event {
            SubscriptionEvent::Ready(Ok(())) => {
                self.connectivity = ConnectivityStatus::Connected;
                tracing::info!(epoch = self.epoch, "insert subscription ready");
                if self.phase == SyncPhase::Subscribing {
                    self.load_history();
                }
                SyncOutcome::Unchanged
            }
            SubscriptionEvent::Ready(Err(error)) => {
                let error = SyncError::LiveChannelFailed(error);
                let orphaned = self.lose_live_channel(&error);
                sink.notify(error.notice());
                if self.phase == SyncPhase::Subscribing {
                    self.load_history();
                }
                orphaned.map_or(SyncOutcome::Unchanged, |content| {
                    SyncOutcome::DraftDelivered { content }
                })
            }
            SubscriptionEvent::Inserted(message) => match self.phase {
                SyncPhase::Subscribing | SyncPhase::LoadingHistory => {
                    tracing::debug!(id = %message.id, "buffering insert until history is applied");
                    self.buffered.push(message);
                    SyncOutcome::Unchanged
                }
                SyncPhase::Live => self.accept_live(message),
                SyncPhase::Idle => SyncOutcome::Unchanged,
            },
            SubscriptionEvent::Closed(error) => {
                let error = SyncError::LiveChannelFailed(error.unwrap_or_else(|| {
                    StoreError::Unavailable("channel closed by the store".to_owned())
                }));
                let orphaned = self.lose_live_channel(&error);
                sink.notify(Notice::error(LIVE_DISCONNECTED_NOTICE));
                if self.phase == SyncPhase::Subscribing {
                    self.load_history();
                }
                orphaned.map_or(SyncOutcome::Unchanged, |content| {
                    SyncOutcome::DraftDelivered { content }
                })
            }
        }
    }

    fn apply_history(
        &mut self,
        result: Result<Vec<Message>, StoreError>,
        sink: &mut dyn NotificationSink,
    ) -> SyncOutcome {
        if self.phase != SyncPhase::LoadingHistory {
            tracing::debug!(phase = ?self.phase, "ignoring unexpected history answer");
            return SyncOutcome::Unchanged;
        }

        match result {
            Ok(history) => {
                tracing::info!(
                    epoch = self.epoch,
                    count = history.len(),
                    buffered = self.buffered.len(),
                    "message history loaded"
                );
                self.feed.replace_with_history(history);
            }
            Err(error) => {
                let error = SyncError::HistoryLoadFailed(error);
                tracing::warn!(code = error.code(), error = %error, "message history unavailable");
                sink.notify(error.notice());
                self.feed.set_error();
            }
        }

        self.phase = SyncPhase::Live;
        for message in std::mem::take(&mut self.buffered) {
            if !self.feed.append(message) {
                tracing::debug!("buffered insert already present in history");
            }
        }

        match self.settle_echoes() {
            Some(content) => SyncOutcome::DraftDelivered { content },
            None => SyncOutcome::FeedChanged,
        }
    }

    fn apply_send_result(
        &mut self,
        result: Result<Message, StoreError>,
        sink: &mut dyn NotificationSink,
    ) -> SyncOutcome {
        match result {
            Ok(stored) => {
                tracing::debug!(id = %stored.id, "message stored; waiting for echo");
                if self.subscription.is_none() {
                    // Nothing will echo it back.
                    return SyncOutcome::DraftDelivered {
                        content: stored.content,
                    };
                }

                self.pending_echoes.push((stored.id, stored.content));
                match self.settle_echoes() {
                    Some(content) => SyncOutcome::DraftDelivered { content },
                    None => SyncOutcome::Unchanged,
                }
            }
            Err(error) => {
                let error = SyncError::SendFailed(error);
                tracing::warn!(code = error.code(), error = %error, "message was not sent");
                sink.notify(error.notice());
                SyncOutcome::DraftKept
            }
        }
    }

    fn accept_live(&mut self, message: Message) -> SyncOutcome {
        let id = message.id.clone();
        if !self.feed.append(message) {
            tracing::debug!(id = %id, "ignoring redelivered insert");
            return SyncOutcome::Unchanged;
        }

        let pending = self
            .pending_echoes
            .iter()
            .position(|(pending, _)| *pending == id);
        match pending {
            Some(index) => SyncOutcome::DraftDelivered {
                content: self.pending_echoes.remove(index).1,
            },
            None => SyncOutcome::FeedChanged,
        }
    }

    /// Returns the content of the newest stored message that can no longer be echoed.
    fn lose_live_channel(&mut self, error: &SyncError) -> Option<String> {
        tracing::warn!(code = error.code(), error = %error, "live updates lost");
        self.unsubscribe();
        self.connectivity = ConnectivityStatus::Disconnected;

        let newest = self.pending_echoes.pop().map(|(_, content)| content);
        self.pending_echoes.clear();
        newest
    }

    /// Drops pending echoes that are already listed; returns the newest one's content.
    fn settle_echoes(&mut self) -> Option<String> {
        let feed = &self.feed;
        let mut delivered = None;
        self.pending_echoes.retain(|(id, content)| {
            if feed.contains(id) {
                delivered = Some(content.clone());
                false
            } else {
                true
            }
        });
        delivered
    }
}

impl<S: MessageStore> Drop for MessageSync<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
