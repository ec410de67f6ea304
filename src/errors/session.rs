// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for the session lifecycle and completion tracking.

use thiserror::Error;

use crate::errors::{ConfigError, ProcessorTypeNotFound};
use crate::session::RunState;
use crate::traits::ProcessorId;

/// Misuse of the completion latch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatchError {
    /// `count_down` was called with no outstanding work registered.
    #[error("count_down called with no outstanding work (count is {outstanding})")]
    Underflow { outstanding: usize },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    ProcessorType(#[from] ProcessorTypeNotFound),

    #[error(transparent)]
    Latch(#[from] LatchError),

    #[error("Failed to start concurrency group: {0}")]
    ConcurrencyGroup(#[source] std::io::Error),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("terminate must be called from outside the session's concurrency group")]
    TerminateFromWorker,

    #[error("Session is {0}; processors can only be created while running")]
    NotRunning(RunState),

    #[error("Processor {0} is not registered with this session")]
    UnknownProcessor(ProcessorId),

    #[error("Task run claims processor {claimed} but was recorded under processor {processor}")]
    ProcessorMismatch {
        processor: ProcessorId,
        claimed: ProcessorId,
    },
}
