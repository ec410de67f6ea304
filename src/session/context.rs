// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use uuid::Uuid;

use crate::errors::SessionError;
use crate::session::latch::CompletionLatch;
use crate::session::state::{AtomicRunState, RunState};
use crate::traits::{ProcessorId, TaskId, TaskRun};

struct Shared {
    run_id: Uuid,
    handle: Handle,
    latch: CompletionLatch,
    aborted: AtomicBool,
    state: AtomicRunState,
    registered: AtomicUsize,
    next_task: AtomicU64,
    // Keyed by creation index, so iteration follows processor creation order
    ledger: Mutex<BTreeMap<ProcessorId, Vec<TaskRun>>>,
    env: Vec<(String, String)>,
}

/// The part of a session that processors and task runs hold on to.
///
/// Cheap to clone. Holds the run identity, the concurrency group handle, the
/// completion latch, the aborted flag and the task ledger, but not the
/// processor registry, so processors never keep their own session alive
/// through a reference cycle.
#[derive(Clone)]
pub struct SessionContext {
    shared: Arc<Shared>,
}

impl SessionContext {
    pub(crate) fn new(run_id: Uuid, handle: Handle, env: Vec<(String, String)>) -> Self {
        Self {
            shared: Arc::new(Shared {
                run_id,
                handle,
                latch: CompletionLatch::new(),
                aborted: AtomicBool::new(false),
                state: AtomicRunState::new(RunState::Running),
                registered: AtomicUsize::new(0),
                next_task: AtomicU64::new(0),
                ledger: Mutex::new(BTreeMap::new()),
                env,
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }

    /// Handle of the session's concurrency group. All task runs are spawned on it.
    pub fn handle(&self) -> &Handle {
        &self.shared.handle
    }

    pub fn latch(&self) -> &CompletionLatch {
        &self.shared.latch
    }

    /// Environment exported to task commands, from the `env` section.
    pub fn env(&self) -> &[(String, String)] {
        &self.shared.env
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RunState {
        self.shared.state.load()
    }

    pub fn next_task_id(&self) -> TaskId {
        TaskId(self.shared.next_task.fetch_add(1, Ordering::Relaxed))
    }

    /// Append a task run to the ledger under `processor`.
    ///
    /// Runs keep the order in which they were recorded for that processor.
    /// The run must name the same processor it is recorded under.
    pub fn record_task(&self, processor: ProcessorId, run: TaskRun) -> Result<(), SessionError> {
        if processor.0 >= self.shared.registered.load(Ordering::Acquire) {
            return Err(SessionError::UnknownProcessor(processor));
        }
        if run.processor != processor {
            return Err(SessionError::ProcessorMismatch {
                processor,
                claimed: run.processor,
            });
        }

        self.shared
            .ledger
            .lock()
            .entry(processor)
            .or_default()
            .push(run);
        Ok(())
    }

    /// Snapshot of the ledger grouped by processor, in creation order.
    pub fn task_ledger(&self) -> Vec<(ProcessorId, Vec<TaskRun>)> {
        self.shared
            .ledger
            .lock()
            .iter()
            .map(|(id, runs)| (*id, runs.clone()))
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.shared.ledger.lock().values().map(Vec::len).sum()
    }

    pub(crate) fn register_processor(&self) {
        self.shared.registered.fetch_add(1, Ordering::AcqRel);
    }

    /// Set the aborted flag, returning whether it was already set.
    pub(crate) fn mark_aborted(&self) -> bool {
        self.shared.aborted.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn transition(&self, from: RunState, to: RunState) -> Result<(), RunState> {
        self.shared.state.transition(from, to)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("run_id", &self.shared.run_id)
            .field("state", &self.state())
            .field("aborted", &self.is_aborted())
            .field("outstanding", &self.shared.latch.outstanding())
            .finish_non_exhaustive()
    }
}
