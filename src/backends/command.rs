// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Child process execution shared by the command-running backends.

use std::borrow::Cow;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::traits::TaskOutcome;

/// How to launch one command line.
#[derive(Debug, Clone)]
pub struct CommandLine<'a> {
    pub shell: &'a str,
    pub command: &'a str,
    pub env: &'a [(String, String)],
    /// Drop the inherited environment, keeping only these names plus `env`.
    pub passthrough: Option<&'a [String]>,
}

/// Run `line` through `<shell> -c` until it exits or `cancel` fires.
///
/// The child is killed on cancellation. Stderr is drained and logged at
/// debug level so the pipe never fills.
pub async fn run_command(line: CommandLine<'_>, cancel: CancellationToken) -> TaskOutcome {
    let mut cmd = Command::new(line.shell);
    cmd.arg("-c")
        .arg(line.command)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(keep) = line.passthrough {
        cmd.env_clear();
        for name in keep {
            if let Ok(value) = std::env::var(name) {
                cmd.env(name, value);
            }
        }
    }
    cmd.envs(line.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return TaskOutcome::LaunchFailed(format!("{}: {}", line.shell, e)),
    };

    if let Some(stderr) = child.stderr.take() {
        let command = line.command.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                tracing::debug!(command = %command, "stderr: {}", text);
            }
        });
    }

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => TaskOutcome::Succeeded,
            // Killed by a signal has no code
            Ok(status) => TaskOutcome::Failed { exit_code: status.code().unwrap_or(-1) },
            Err(e) => TaskOutcome::LaunchFailed(e.to_string()),
        },
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, command = line.command, "failed to kill cancelled task");
            }
            TaskOutcome::Cancelled
        }
    }
}

/// Quote one word for interpolation into a `sh -c` command line.
pub fn shell_quote(word: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(word)).into_owned()
}
