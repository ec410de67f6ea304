// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::config::consts::SESSION_ABORTED_EXIT_CODE;

/// Lifecycle state of a session. `Terminated` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Terminated,
    Aborted,
}

impl RunState {
    fn as_u8(self) -> u8 {
        match self {
            RunState::Running => 0,
            RunState::Terminated => 1,
            RunState::Aborted => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::Running,
            1 => RunState::Terminated,
            _ => RunState::Aborted,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Terminated => write!(f, "terminated"),
            RunState::Aborted => write!(f, "aborted"),
        }
    }
}

/// How a session ended, for the caller to turn into a process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Terminated,
    Aborted,
}

impl ExitStatus {
    /// Exit code to report, if this status overrides the process default.
    pub fn code(self) -> Option<i32> {
        match self {
            ExitStatus::Terminated => None,
            ExitStatus::Aborted => Some(SESSION_ABORTED_EXIT_CODE),
        }
    }
}

/// `RunState` cell readable from any thread without locking.
#[derive(Debug)]
pub(crate) struct AtomicRunState(AtomicU8);

impl AtomicRunState {
    pub(crate) fn new(state: RunState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn load(&self) -> RunState {
        RunState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`, or report the state actually found.
    pub(crate) fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(RunState::from_u8)
    }
}
