use anyhow::Result;

use crate::{
    cli::{Cli, Command},
    domain,
    infra::{self, error::AppError},
    supabase, ui,
    usecases::{self, bootstrap, context::StoreMode},
};

pub fn run(cli: Cli) -> Result<()> {
    let Command::Run { offline } = cli.command_or_default();
    let mode = if offline {
        StoreMode::Offline
    } else {
        StoreMode::Online
    };

    let context = match bootstrap::bootstrap(cli.config.as_deref(), mode) {
        Ok(context) => context,
        Err(error) => {
            for line in startup_hint_lines(&error) {
                eprintln!("{line}");
            }
            return Err(error);
        }
    };

    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        supabase = supabase::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let mut shell = bootstrap::compose_shell(&context);
    let outcome = ui::shell::start(
        &context,
        shell.event_source.as_mut(),
        shell.orchestrator.as_mut(),
    );

    if let Err(error) = &outcome {
        tracing::error!(error = ?error, "TUI shell failed");
    }
    outcome
}

/// Guidance printed before exiting on a startup failure the user can fix.
fn startup_hint_lines(error: &anyhow::Error) -> Vec<String> {
    let Some(error) = error.downcast_ref::<AppError>() else {
        return Vec::new();
    };

    match error {
        AppError::ConfigInvalid { .. } => vec![
            format!("{}: the backend is not configured.", error.code()),
            format!(
                "Set [backend] url and anon_key in config.toml, or {} and {}.",
                infra::config::BACKEND_URL_ENV,
                infra::config::ANON_KEY_ENV
            ),
            "Run `lovechat run --offline` to try the room without a backend.".to_owned(),
        ],
        AppError::ConfigRead { .. } | AppError::ConfigParse { .. } => {
            vec![format!("{}: fix the config file and retry.", error.code())]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_hint_points_at_settings_and_offline_mode() {
        let error = anyhow::Error::new(AppError::ConfigInvalid {
            reason: "backend.url is empty".to_owned(),
        });

        let lines = startup_hint_lines(&error);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("CONFIG_INVALID"));
        assert!(lines[1].contains("LOVECHAT_BACKEND_URL"));
        assert!(lines[2].contains("--offline"));
    }

    #[test]
    fn unrelated_failures_print_no_hint() {
        let error = anyhow::anyhow!("terminal is not a tty");

        assert!(startup_hint_lines(&error).is_empty());
    }
}
