// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for session lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Session construction and concurrency group sizing
//! * Graceful termination
//! * Abort requests
//! * Completion latch misuse

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Session constructed and concurrency group started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionStarted<'a> {
    pub run_id: &'a str,
    pub pool_size: usize,
    pub default_processor: &'a str,
}

impl Display for SessionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session {} started: pool_size={}, default processor '{}'",
            self.run_id, self.pool_size, self.default_processor
        )
    }
}

impl StructuredLog for SessionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            pool_size = self.pool_size,
            default_processor = self.default_processor,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "session",
            span_name = name,
            run_id = self.run_id,
            pool_size = self.pool_size,
        )
    }
}

/// Graceful termination started; processors are about to be joined.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionTerminating<'a> {
    pub run_id: &'a str,
    pub processor_count: usize,
    pub bound_on_termination: usize,
}

impl Display for SessionTerminating<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session {} terminating: joining {} processors ({} bound on termination)",
            self.run_id, self.processor_count, self.bound_on_termination
        )
    }
}

impl StructuredLog for SessionTerminating<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            processor_count = self.processor_count,
            bound_on_termination = self.bound_on_termination,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "session_terminate",
            span_name = name,
            run_id = self.run_id,
            processor_count = self.processor_count,
        )
    }
}

/// Every processor joined and the concurrency group shut down.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SessionTerminated<'a> {
    pub run_id: &'a str,
    pub processor_count: usize,
    pub task_count: usize,
    pub duration: std::time::Duration,
}

impl Display for SessionTerminated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session {} terminated: {} processors, {} task runs, shutdown took {:?}",
            self.run_id, self.processor_count, self.task_count, self.duration
        )
    }
}

impl StructuredLog for SessionTerminated<'_> {
    fn log(&self) {
        tracing::info!(
            run_id = self.run_id,
            processor_count = self.processor_count,
            task_count = self.task_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "session_terminated",
            span_name = name,
            run_id = self.run_id,
            duration = ?self.duration,
        )
    }
}

/// Session aborted; every processor has been told to cancel.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SessionAborted<'a> {
    pub run_id: &'a str,
    pub processor_count: usize,
    pub exit_code: i32,
}

impl Display for SessionAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session {} aborted: cancelled {} processors, exit code {}",
            self.run_id, self.processor_count, self.exit_code
        )
    }
}

impl StructuredLog for SessionAborted<'_> {
    fn log(&self) {
        tracing::error!(
            run_id = self.run_id,
            processor_count = self.processor_count,
            exit_code = self.exit_code,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "session_aborted",
            span_name = name,
            run_id = self.run_id,
            exit_code = self.exit_code,
        )
    }
}

/// A lifecycle transition was requested from a state that does not allow it.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct TransitionRejected<'a> {
    pub run_id: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for TransitionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Session {} cannot move from {} to {}",
            self.run_id, self.from, self.to
        )
    }
}

/// `count_down` was called with nothing outstanding.
///
/// # Log Level
/// `error!` - Caller contract violation
pub struct LatchUnderflow {
    pub outstanding: usize,
}

impl Display for LatchUnderflow {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Completion latch count_down without matching count_up (outstanding={})",
            self.outstanding
        )
    }
}

impl StructuredLog for LatchUnderflow {
    fn log(&self) {
        tracing::error!(outstanding = self.outstanding, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("latch_underflow", span_name = name, outstanding = self.outstanding)
    }
}
