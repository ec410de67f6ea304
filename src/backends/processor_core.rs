// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bookkeeping every built-in processor shares: recording runs with the
//! session, counting them on the completion latch, spawning them on the
//! concurrency group, and join/terminate.

use std::future::Future;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::errors::SubmitError;
use crate::observability::messages::processor::{ProcessorCancelled, TaskFinished, TaskSubmitted};
use crate::observability::messages::StructuredLog;
use crate::session::SessionContext;
use crate::traits::{ProcessorBinding, ProcessorId, ScriptBinding, TaskOutcome, TaskRun, TaskSpec};

/// Counts the latch down once the task holding it is dropped.
struct CountDownOnDrop(SessionContext);

impl Drop for CountDownOnDrop {
    fn drop(&mut self) {
        // An underflow here is logged by the latch itself
        let _ = self.0.latch().count_down();
    }
}

pub struct ProcessorCore {
    binding: ProcessorBinding,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl ProcessorCore {
    pub fn new(binding: ProcessorBinding) -> Self {
        Self {
            binding,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn id(&self) -> ProcessorId {
        self.binding.id
    }

    pub fn type_name(&self) -> &str {
        &self.binding.type_name
    }

    pub fn bind_on_termination(&self) -> bool {
        self.binding.bind_on_termination
    }

    pub fn session(&self) -> &SessionContext {
        &self.binding.session
    }

    pub fn script(&self) -> Option<&ScriptBinding> {
        self.binding.script.as_ref()
    }

    /// Record a run for `spec` and drive `work` to completion on the session's
    /// concurrency group.
    ///
    /// `launched` is the command line as the backend will actually run it.
    /// The latch is counted up before the spawn and down when `work` ends,
    /// whatever its outcome, including a panic or the group shutting down.
    pub fn spawn<F, Fut>(
        &self,
        spec: TaskSpec,
        launched: String,
        work: F,
    ) -> Result<TaskRun, SubmitError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let session = self.session().clone();
        if session.is_aborted() {
            return Err(SubmitError::SessionAborted);
        }
        if self.tracker.is_closed() || self.cancel.is_cancelled() {
            return Err(SubmitError::ProcessorClosed {
                processor: self.id(),
            });
        }

        let run = TaskRun {
            id: session.next_task_id(),
            processor: self.id(),
            name: spec.name,
            command: launched,
        };
        session.record_task(self.id(), run.clone())?;
        session.latch().count_up();

        TaskSubmitted {
            processor_id: run.processor.0,
            task_id: run.id.0,
            task_name: &run.name,
            command: &run.command,
        }
        .log();

        let work = work(self.cancel.child_token());
        let finished = run.clone();
        let handle = session.handle().clone();
        self.tracker.spawn_on(
            async move {
                let _count_down = CountDownOnDrop(session);
                let started = Instant::now();
                let outcome = work.await;

                TaskFinished {
                    processor_id: finished.processor.0,
                    task_id: finished.id.0,
                    task_name: &finished.name,
                    outcome: &outcome,
                    succeeded: outcome.is_success(),
                    duration: started.elapsed(),
                }
                .log();
            },
            &handle,
        );

        Ok(run)
    }

    /// Stop accepting work and wait for every spawned run to finish.
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancel every in-flight run. Does not wait.
    pub fn terminate(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::warn!(
            "{}",
            ProcessorCancelled {
                processor_id: self.id().0,
                processor_type: self.type_name(),
            }
        );
        self.tracker.close();
        self.cancel.cancel();
    }
}
