//! In-process stand-ins for external collaborators.
//!
//! `InMemoryMessageStore` backs `run --offline` and the sync tests. Clones
//! share one table, so several clients can talk through the same instance.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Duration, Utc};

use crate::{
    domain::{
        message::{Message, MessageId, NewMessage},
        sync::{StoreError, SubscriptionEvent},
    },
    usecases::contracts::{Completion, InsertSubscription, MessageStore, SubscriptionHandler},
};

#[cfg(test)]
use anyhow::Result;

#[cfg(test)]
use crate::infra::{config::AppConfig, contracts::ConfigAdapter};

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StubConfigAdapter;

#[cfg(test)]
impl ConfigAdapter for StubConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(AppConfig::default())
    }
}

type SharedHandler = Arc<dyn Fn(SubscriptionEvent) + Send + Sync + 'static>;

struct HeldFetch {
    done: Completion<Vec<Message>>,
    snapshot: Vec<Message>,
}

struct InMemoryState {
    rows: Vec<Message>,
    epoch_start: DateTime<Utc>,
    next_row: i64,
    subscribers: Vec<(u64, SharedHandler)>,
    next_subscriber: u64,
    fetch_count: usize,
    insert_count: usize,
    subscribe_count: usize,
    hold_fetches: bool,
    held: Vec<HeldFetch>,
    fail_next_fetch: Option<StoreError>,
    fail_next_insert: Option<StoreError>,
    refuse_subscriptions: Option<StoreError>,
    silent_subscriptions: bool,
}

impl Default for InMemoryState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            epoch_start: Utc::now(),
            next_row: 0,
            subscribers: Vec::new(),
            next_subscriber: 0,
            fetch_count: 0,
            insert_count: 0,
            subscribe_count: 0,
            hold_fetches: false,
            held: Vec::new(),
            fail_next_fetch: None,
            fail_next_insert: None,
            refuse_subscriptions: None,
            silent_subscriptions: false,
        }
    }
}

/// A message table living in memory, with a loopback insert feed.
///
/// Answers immediately on the calling thread unless fetches are held. Rows
/// are returned in the order they were stored or seeded, not sorted.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<Mutex<InMemoryState>>,
}

impl std::fmt::Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemoryMessageStore")
            .field("rows", &state.rows.len())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        // A poisoned table only means a test callback panicked; the rows are intact.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn seed(&self, rows: Vec<Message>) {
        self.lock().rows.extend(rows);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn rows(&self) -> Vec<Message> {
        self.lock().rows.clone()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn insert_count(&self) -> usize {
        self.lock().insert_count
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn subscribe_count(&self) -> usize {
        self.lock().subscribe_count
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn active_subscriptions(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Keeps fetch answers back until `release_fetches`. Each answer carries
    /// the rows present when the fetch was issued.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn hold_fetches(&self) {
        self.lock().hold_fetches = true;
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn release_fetches(&self) {
        let held = {
            let mut state = self.lock();
            state.hold_fetches = false;
            std::mem::take(&mut state.held)
        };

        for fetch in held {
            (fetch.done)(Ok(fetch.snapshot));
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn fail_next_fetch(&self, error: StoreError) {
        self.lock().fail_next_fetch = Some(error);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn fail_next_insert(&self, error: StoreError) {
        self.lock().fail_next_insert = Some(error);
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn refuse_subscriptions(&self, error: StoreError) {
        self.lock().refuse_subscriptions = Some(error);
    }

    /// New channels never answer: no ready, no inserts.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn silence_subscriptions(&self) {
        self.lock().silent_subscriptions = true;
    }

    /// Ends every live channel as if the connection dropped.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn drop_connections(&self, error: StoreError) {
        let handlers: Vec<SharedHandler> = {
            let mut state = self.lock();
            state
                .subscribers
                .drain(..)
                .map(|(_, handler)| handler)
                .collect()
        };

        for handler in handlers {
            handler(SubscriptionEvent::Closed(Some(error.clone())));
        }
    }

    fn remove_subscriber(inner: &Weak<Mutex<InMemoryState>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut state = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.subscribers.retain(|(subscriber, _)| *subscriber != id);
        }
    }
}

impl MessageStore for InMemoryMessageStore {
    fn fetch_ordered(&self, done: Completion<Vec<Message>>) {
        let answer = {
            let mut state = self.lock();
            state.fetch_count += 1;

            if let Some(error) = state.fail_next_fetch.take() {
                Err(error)
            } else if state.hold_fetches {
                let snapshot = state.rows.clone();
                state.held.push(HeldFetch { done, snapshot });
                return;
            } else {
                Ok(state.rows.clone())
            }
        };

        done(answer);
    }

    fn insert(&self, record: NewMessage, done: Completion<Message>) {
        let (stored, handlers) = {
            let mut state = self.lock();
            state.insert_count += 1;

            if let Some(error) = state.fail_next_insert.take() {
                drop(state);
                done(Err(error));
                return;
            }

            state.next_row += 1;
            let stored = Message {
                id: MessageId::new(format!("mem-{}", state.next_row)),
                username: record.username,
                content: record.content,
                created_at: state.epoch_start + Duration::seconds(state.next_row),
            };
            state.rows.push(stored.clone());

            let handlers: Vec<SharedHandler> = state
                .subscribers
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect();
            (stored, handlers)
        };

        done(Ok(stored.clone()));
        for handler in handlers {
            handler(SubscriptionEvent::Inserted(stored.clone()));
        }
    }

    fn subscribe_inserts(&self, handler: SubscriptionHandler) -> Box<dyn InsertSubscription> {
        let handler: SharedHandler = Arc::from(handler);

        let registration = {
            let mut state = self.lock();
            state.subscribe_count += 1;
            if state.silent_subscriptions {
                return Box::new(InMemorySubscription {
                    store: Weak::new(),
                    id: None,
                });
            }

            match state.refuse_subscriptions.clone() {
                Some(error) => Err(error),
                None => {
                    state.next_subscriber += 1;
                    let id = state.next_subscriber;
                    state.subscribers.push((id, Arc::clone(&handler)));
                    Ok(id)
                }
            }
        };

        match registration {
            Ok(id) => {
                handler(SubscriptionEvent::Ready(Ok(())));
                Box::new(InMemorySubscription {
                    store: Arc::downgrade(&self.inner),
                    id: Some(id),
                })
            }
            Err(error) => {
                handler(SubscriptionEvent::Ready(Err(error)));
                Box::new(InMemorySubscription {
                    store: Weak::new(),
                    id: None,
                })
            }
        }
    }
}

struct InMemorySubscription {
    store: Weak<Mutex<InMemoryState>>,
    id: Option<u64>,
}

impl InsertSubscription for InMemorySubscription {
    fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            InMemoryMessageStore::remove_subscriber(&self.store, id);
        }
    }
}

impl Drop for InMemorySubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
