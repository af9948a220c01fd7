//! Lifecycle hook commands.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::Hooks;
use crate::error::{Error, Result};

/// The points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// After configuration, before anything is built.
    Start,
    /// First thing the executor does.
    BuildStart,
    /// After the last phase, before stats are finalised.
    BuildEnd,
    /// After the build report.
    End,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::Start => "start",
            HookPoint::BuildStart => "buildStart",
            HookPoint::BuildEnd => "buildEnd",
            HookPoint::End => "end",
        }
    }

    fn command<'a>(&self, hooks: &'a Hooks) -> Option<&'a str> {
        match self {
            HookPoint::Start => hooks.start.as_deref(),
            HookPoint::BuildStart => hooks.build_start.as_deref(),
            HookPoint::BuildEnd => hooks.build_end.as_deref(),
            HookPoint::End => hooks.end.as_deref(),
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the hook configured for `point`, if any, in `root`.
///
/// The command inherits stdout/stderr and must exit successfully.
pub async fn run_hook(root: &Path, hooks: &Hooks, point: HookPoint) -> Result<()> {
    let Some(command) = point.command(hooks) else {
        return Ok(());
    };

    tracing::info!(hook = %point, command, "Running hook");

    let hook_error = |reason: String| Error::Hook {
        name: point.as_str().to_string(),
        command: command.to_string(),
        reason,
    };

    let status = shell(command)
        .current_dir(root)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| hook_error(format!("failed to spawn: {e}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(hook_error(match status.code() {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }))
    }
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
