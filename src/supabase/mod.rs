//! Supabase-compatible message store: PostgREST for the table, Realtime for
//! insert notifications. All I/O runs on a runtime owned by the store.

mod realtime;
mod rest;
mod wire;

use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::{
    domain::message::{Message, NewMessage},
    infra::{config::AppConfig, error::AppError},
    usecases::contracts::{Completion, InsertSubscription, MessageStore, SubscriptionHandler},
};

use realtime::{RealtimeSettings, RealtimeSubscription};
use rest::RestClient;

const IO_WORKER_THREADS: usize = 2;

/// Returns the store module name for smoke checks.
pub fn module_name() -> &'static str {
    "supabase"
}

pub struct SupabaseStore {
    runtime: Runtime,
    rest: RestClient,
    realtime: RealtimeSettings,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("topic", &self.realtime.topic())
            .finish_non_exhaustive()
    }
}

impl SupabaseStore {
    pub fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(IO_WORKER_THREADS)
            .thread_name("lovechat-io")
            .enable_all()
            .build()
            .map_err(AppError::RuntimeInit)?;

        let backend = &config.backend;
        let rest = RestClient::new(backend)?;
        let socket_url = realtime::websocket_url(&backend.url, &backend.anon_key).map_err(
            |error| AppError::ConfigInvalid {
                reason: error.to_string(),
            },
        )?;

        tracing::info!(
            table = %backend.table,
            schema = %backend.schema,
            "supabase store configured"
        );

        Ok(Self {
            runtime,
            rest,
            realtime: RealtimeSettings {
                socket_url,
                access_token: backend.anon_key.clone(),
                schema: backend.schema.clone(),
                table: backend.table.clone(),
                heartbeat_interval: Duration::from_millis(config.realtime.heartbeat_interval_ms),
                join_timeout: Duration::from_millis(config.realtime.join_timeout_ms),
            },
        })
    }
}

impl MessageStore for SupabaseStore {
    fn fetch_ordered(&self, done: Completion<Vec<Message>>) {
        let rest = self.rest.clone();
        self.runtime.spawn(async move {
            let result = rest.fetch_ordered().await;
            if let Err(error) = &result {
                tracing::debug!(code = error.code(), error = %error, "history fetch failed");
            }
            done(result);
        });
    }

    fn insert(&self, record: NewMessage, done: Completion<Message>) {
        let rest = self.rest.clone();
        self.runtime.spawn(async move {
            let result = rest.insert(&record).await;
            if let Err(error) = &result {
                tracing::debug!(code = error.code(), error = %error, "insert failed");
            }
            done(result);
        });
    }

    fn subscribe_inserts(&self, handler: SubscriptionHandler) -> Box<dyn InsertSubscription> {
        Box::new(RealtimeSubscription::start(
            self.runtime.handle(),
            self.realtime.clone(),
            handler,
        ))
    }
}
