use std::{path::Path, sync::mpsc, time::Duration};

use anyhow::Result;

use crate::{
    domain::shell_state::ShellState,
    infra::{
        self,
        config::{validate_online, AppConfig, FileConfigAdapter},
        contracts::ConfigAdapter,
        stubs::InMemoryMessageStore,
    },
    supabase::SupabaseStore,
    ui::CrosstermEventSource,
    usecases::{
        context::{AppContext, StoreMode},
        contracts::{AppEventSource, MessageStore, ShellOrchestrator},
        shell::DefaultShellOrchestrator,
    },
};

pub struct ShellComposition<'a> {
    pub event_source: Box<dyn AppEventSource>,
    pub orchestrator: Box<dyn ShellOrchestrator + 'a>,
}

pub fn bootstrap(config_path: Option<&Path>, mode: StoreMode) -> Result<AppContext> {
    let config = FileConfigAdapter::new(config_path).load()?;
    let guard = infra::logging::init(&config.logging)?;
    let context = build_context(config, mode)?;

    Ok(context.with_log_guard(guard))
}

fn build_context(config: AppConfig, mode: StoreMode) -> Result<AppContext> {
    let store: Box<dyn MessageStore> = match mode {
        StoreMode::Online => {
            validate_online(&config)?;
            Box::new(SupabaseStore::connect(&config)?)
        }
        StoreMode::Offline => Box::new(InMemoryMessageStore::new()),
    };

    tracing::info!(mode = ?mode, table = %config.backend.table, "application context ready");
    Ok(AppContext::new(config, mode, store))
}

/// Wires the terminal event source and the orchestrator to one sync channel.
pub fn compose_shell(context: &AppContext) -> ShellComposition<'_> {
    let (sync_tx, sync_rx) = mpsc::channel();
    let state = ShellState::with_notice_ttl(Duration::from_millis(context.config.ui.notice_ttl_ms));

    ShellComposition {
        event_source: Box::new(CrosstermEventSource::new(sync_rx)),
        orchestrator: Box::new(
            DefaultShellOrchestrator::new(state, context.store.as_ref(), sync_tx)
                .with_join_timeout(Duration::from_millis(context.config.realtime.join_timeout_ms)),
        ),
    }
}
