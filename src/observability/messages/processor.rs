// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for processor resolution, creation and task runs.
//!
//! This module contains message types for logging events related to:
//! * Backend name to processor type resolution
//! * Processor instantiation and configuration
//! * Task run submission and completion
//! * Processor join and cancellation

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Backend name resolved to a processor type.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use pipeline_session::observability::messages::processor::ProcessorTypeResolved;
///
/// let msg = ProcessorTypeResolved {
///     requested: "OGE",
///     resolved: "sge",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ProcessorTypeResolved<'a> {
    pub requested: &'a str,
    pub resolved: &'a str,
}

impl Display for ProcessorTypeResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved processor '{}' to type '{}'",
            self.requested, self.resolved
        )
    }
}

impl StructuredLog for ProcessorTypeResolved<'_> {
    fn log(&self) {
        tracing::info!(
            requested = self.requested,
            resolved = self.resolved,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "processor_resolution",
            span_name = name,
            requested = self.requested,
            resolved = self.resolved,
        )
    }
}

/// Backend name could not be resolved.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ProcessorTypeUnresolved<'a> {
    pub requested: &'a str,
}

impl Display for ProcessorTypeUnresolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor '{}' is neither a built-in alias nor a registered plugin",
            self.requested
        )
    }
}

impl StructuredLog for ProcessorTypeUnresolved<'_> {
    fn log(&self) {
        tracing::error!(requested = self.requested, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "processor_resolution_failed",
            span_name = name,
            requested = self.requested,
        )
    }
}

/// Processor instantiated, configured and registered with the session.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ProcessorCreated<'a> {
    pub processor_id: usize,
    pub processor_type: &'a str,
    pub applied: usize,
    pub ignored: usize,
    pub failed: usize,
    pub bind_on_termination: bool,
}

impl Display for ProcessorCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created processor #{} of type '{}': {} attributes applied, {} ignored, {} failed",
            self.processor_id, self.processor_type, self.applied, self.ignored, self.failed
        )
    }
}

impl StructuredLog for ProcessorCreated<'_> {
    fn log(&self) {
        tracing::info!(
            processor_id = self.processor_id,
            processor_type = self.processor_type,
            applied = self.applied,
            ignored = self.ignored,
            failed = self.failed,
            bind_on_termination = self.bind_on_termination,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "processor",
            span_name = name,
            processor_id = self.processor_id,
            processor_type = self.processor_type,
        )
    }
}

/// Task run handed to the concurrency group.
///
/// # Log Level
/// `debug!` - Per-task detail
pub struct TaskSubmitted<'a> {
    pub processor_id: usize,
    pub task_id: u64,
    pub task_name: &'a str,
    pub command: &'a str,
}

impl Display for TaskSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor #{} submitted task {} '{}': {}",
            self.processor_id, self.task_id, self.task_name, self.command
        )
    }
}

impl StructuredLog for TaskSubmitted<'_> {
    fn log(&self) {
        tracing::debug!(
            processor_id = self.processor_id,
            task_id = self.task_id,
            task_name = self.task_name,
            command = self.command,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "task",
            span_name = name,
            processor_id = self.processor_id,
            task_id = self.task_id,
            task_name = self.task_name,
        )
    }
}

/// Task run finished, successfully or not.
///
/// # Log Level
/// `info!` on success, `warn!` otherwise
pub struct TaskFinished<'a> {
    pub processor_id: usize,
    pub task_id: u64,
    pub task_name: &'a str,
    pub outcome: &'a dyn Display,
    pub succeeded: bool,
    pub duration: std::time::Duration,
}

impl Display for TaskFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task {} '{}' on processor #{} finished: {} in {:?}",
            self.task_id, self.task_name, self.processor_id, self.outcome, self.duration
        )
    }
}

impl StructuredLog for TaskFinished<'_> {
    fn log(&self) {
        if self.succeeded {
            tracing::info!(
                processor_id = self.processor_id,
                task_id = self.task_id,
                task_name = self.task_name,
                outcome = %self.outcome,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                processor_id = self.processor_id,
                task_id = self.task_id,
                task_name = self.task_name,
                outcome = %self.outcome,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task_finished",
            span_name = name,
            processor_id = self.processor_id,
            task_id = self.task_id,
        )
    }
}

/// Processor told to cancel its in-flight work.
///
/// # Log Level
/// `warn!` - Degraded behavior
pub struct ProcessorCancelled<'a> {
    pub processor_id: usize,
    pub processor_type: &'a str,
}

impl Display for ProcessorCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Processor #{} ('{}') cancelling in-flight tasks",
            self.processor_id, self.processor_type
        )
    }
}
