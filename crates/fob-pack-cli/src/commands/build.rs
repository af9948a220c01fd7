//! The build command: resolve, run hooks, execute the plan, report.

use std::path::{Path, PathBuf};

use fob_pack::{
    BuildConfiguration, BuildEvent, BuildObserver, BuildPlanExecutor, HookPoint, RolldownEngine,
    resolve_config, run_hook,
};

use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::ui;

/// Execute a build (or print the configuration) for the parsed arguments.
///
/// # Errors
///
/// Configuration that cannot be resolved, a failing hook and the first
/// failing build unit all end the command.
pub async fn execute(args: Cli) -> Result<()> {
    let root = project_root(args.cwd.as_deref())?;
    let config = resolve_config(&root, &args.overrides()).await?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::debug!(root = %root.display(), source = %config.source, "Resolved configuration");
    if !args.quiet {
        ui::info(&format!("Building with config from {}", config.source));
    }

    run_hook(&config.root, &config.hooks, HookPoint::Start).await?;

    let observer = TerminalObserver::new(&config, args.quiet);
    let report = BuildPlanExecutor::new(RolldownEngine::new())
        .with_observer(observer)
        .execute(&config)
        .await?;

    run_hook(&config.root, &config.hooks, HookPoint::End).await?;

    if !args.quiet {
        ui::success(&ui::summary_line(&report.stats));
    }
    Ok(())
}

fn project_root(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    let Some(cwd) = cwd else {
        return Ok(current);
    };

    let root = if cwd.is_absolute() {
        cwd.to_path_buf()
    } else {
        current.join(cwd)
    };
    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "--cwd {} is not a directory",
            cwd.display()
        )));
    }
    Ok(root)
}

/// Prints phases, written units and their filtered engine logs.
struct TerminalObserver {
    width: usize,
    quiet: bool,
}

impl TerminalObserver {
    fn new(config: &BuildConfiguration, quiet: bool) -> Self {
        Self {
            width: config.longest_output(),
            quiet,
        }
    }
}

impl BuildObserver for TerminalObserver {
    fn on_event(&self, event: BuildEvent<'_>) {
        match event {
            BuildEvent::PhaseStarted { phase, units } if !self.quiet => {
                ui::info(&format!("{phase} ({units})"));
            }
            BuildEvent::UnitWritten(report) => {
                if !self.quiet {
                    ui::detail(&ui::unit_line(report, self.width));
                }
                for log in &report.logs {
                    ui::engine_log(log);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_defaults_to_current_dir() {
        assert_eq!(
            project_root(None).unwrap(),
            std::env::current_dir().unwrap()
        );
    }

    #[test]
    fn test_project_root_rejects_missing_dir() {
        let err = project_root(Some(Path::new("definitely/not/here"))).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)), "{err}");
    }

    #[test]
    fn test_project_root_accepts_absolute_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(project_root(Some(dir.path())).unwrap(), dir.path());
    }
}
