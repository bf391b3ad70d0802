use anyhow::Result;

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        log_level = %context.config.logging.level,
        mode = ?context.mode,
        table = %context.config.backend.table,
        "starting TUI shell"
    );

    let mut terminal = TerminalSession::new()?;

    drive(event_source, orchestrator, |orchestrator| {
        terminal.draw(|frame| {
            let (state, feed, connectivity) = orchestrator.view_mut();
            view::render(frame, state, feed, connectivity);
        })
    })?;

    tracing::info!("TUI shell stopped");
    Ok(())
}

/// Draws, then handles one event, until the shell stops running.
fn drive<O, D>(event_source: &mut dyn AppEventSource, orchestrator: &mut O, mut draw: D) -> Result<()>
where
    O: ShellOrchestrator + ?Sized,
    D: FnMut(&mut O) -> Result<()>,
{
    while orchestrator.state().is_running() {
        draw(orchestrator)?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}
