// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution coordinator for one pipeline run.
//!
//! A [`Session`] owns the concurrency group every processor of the run
//! shares, the registry of processors it created and the ledger of task runs
//! they started. It drives the run through one of two endings:
//!
//! ```text
//!            terminate()
//! Running ────────────────▶ Terminated   (join all processors, shut the group down)
//!    │
//!    │       abort()
//!    └────────────────────▶ Aborted      (flag set, every processor cancelled)
//! ```
//!
//! Both endings are terminal. The caller turns the returned [`ExitStatus`]
//! into a process exit code.

mod context;
pub mod injector;
mod latch;
pub mod resolver;
mod state;

#[cfg(test)]
mod integration_tests;

pub use context::SessionContext;
pub use injector::{AttributeInjectionWarning, ConfigInjector, InjectionReport};
pub use latch::CompletionLatch;
pub use resolver::{ProcessorResolver, ProcessorType};
pub use state::{ExitStatus, RunState};

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use serde_yaml::Mapping;
use tokio::runtime::{Handle, Runtime};
use uuid::Uuid;

use crate::config::consts::{FALLBACK_POOL_SIZE, GROUP_SHUTDOWN_TIMEOUT_SECS, SESSION_ABORTED_EXIT_CODE};
use crate::config::RunConfig;
use crate::errors::SessionError;
use crate::observability::messages::processor::ProcessorCreated;
use crate::observability::messages::session::{
    SessionAborted, SessionStarted, SessionTerminated, SessionTerminating, TransitionRejected,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{ProcessorBinding, ProcessorId, ScriptBinding, TaskProcessor, TaskRun};

struct RegisteredProcessor {
    processor: Arc<dyn TaskProcessor>,
    injection: InjectionReport,
}

/// Coordinates the processors and task runs of one pipeline run.
pub struct Session {
    context: SessionContext,
    config: RunConfig,
    resolver: ProcessorResolver,
    default_type: ProcessorType,
    pool_size: usize,
    registry: Mutex<Vec<RegisteredProcessor>>,
    // Taken exactly once, by terminate or drop
    runtime: Mutex<Option<Runtime>>,
    started: Instant,
}

impl Session {
    /// Build a session with only the built-in processor types.
    ///
    /// `None` is rejected; an empty mapping is a valid configuration.
    pub fn new(config: Option<Mapping>) -> Result<Self, SessionError> {
        Self::with_resolver(config, ProcessorResolver::new())
    }

    pub fn with_resolver(
        config: Option<Mapping>,
        resolver: ProcessorResolver,
    ) -> Result<Self, SessionError> {
        Self::from_config(RunConfig::normalize(config)?, resolver)
    }

    pub fn from_config(config: RunConfig, resolver: ProcessorResolver) -> Result<Self, SessionError> {
        let run_id = config.unique_id()?.unwrap_or_else(Uuid::new_v4);
        let pool_size = match config.pool_size()? {
            Some(size) => size,
            None => default_pool_size(),
        };
        let default_type = resolver.resolve(config.processor_name()?)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(pool_size)
            .thread_name("session-worker")
            .enable_all()
            .build()
            .map_err(SessionError::ConcurrencyGroup)?;

        let context = SessionContext::new(run_id, runtime.handle().clone(), config.env_vars());

        SessionStarted {
            run_id: &run_id.to_string(),
            pool_size,
            default_processor: default_type.name(),
        }
        .log();

        Ok(Self {
            context,
            config,
            resolver,
            default_type,
            pool_size,
            registry: Mutex::new(Vec::new()),
            runtime: Mutex::new(Some(runtime)),
            started: Instant::now(),
        })
    }

    /// Create a processor of the default type and register it.
    ///
    /// The `task` section is injected into the new processor. Attributes
    /// that fail to apply are logged and listed in the session report; they
    /// never fail creation.
    pub fn create_processor(
        &self,
        script: Option<ScriptBinding>,
        bind_on_termination: bool,
    ) -> Result<Arc<dyn TaskProcessor>, SessionError> {
        self.instantiate(&self.default_type, script, bind_on_termination)
    }

    /// Like [`Session::create_processor`], for an explicitly named type.
    pub fn create_processor_of(
        &self,
        name: &str,
        script: Option<ScriptBinding>,
        bind_on_termination: bool,
    ) -> Result<Arc<dyn TaskProcessor>, SessionError> {
        let processor_type = self.resolver.resolve(Some(name))?;
        self.instantiate(&processor_type, script, bind_on_termination)
    }

    fn instantiate(
        &self,
        processor_type: &ProcessorType,
        script: Option<ScriptBinding>,
        bind_on_termination: bool,
    ) -> Result<Arc<dyn TaskProcessor>, SessionError> {
        // Held across construction so ids stay dense and terminate sees every processor
        let mut registry = self.registry.lock();

        let state = self.context.state();
        if state != RunState::Running {
            return Err(SessionError::NotRunning(state));
        }

        let binding = ProcessorBinding {
            id: ProcessorId(registry.len()),
            type_name: processor_type.name().to_string(),
            session: self.context.clone(),
            script,
            bind_on_termination,
        };
        let (processor, injection) = processor_type.instantiate(binding, self.config.task());

        ProcessorCreated {
            processor_id: processor.id().0,
            processor_type: processor.type_name(),
            applied: injection.applied.len(),
            ignored: injection.ignored.len(),
            failed: injection.failures.len(),
            bind_on_termination,
        }
        .log();

        registry.push(RegisteredProcessor {
            processor: Arc::clone(&processor),
            injection,
        });
        self.context.register_processor();

        Ok(processor)
    }

    /// Append a task run to the ledger. See [`SessionContext::record_task`].
    pub fn record_task(&self, processor: ProcessorId, run: TaskRun) -> Result<(), SessionError> {
        self.context.record_task(processor, run)
    }

    /// Block until every outstanding task run has finished.
    pub fn await_completion(&self) {
        self.context.latch().wait();
    }

    /// Gracefully end the run.
    ///
    /// Processors created with `bind_on_termination` are told first, then
    /// every other processor is joined in creation order, then the bound
    /// ones. Finally the concurrency group is shut down.
    ///
    /// Blocks, so it must not be called from a task on the session's (or any)
    /// tokio runtime.
    pub fn terminate(&self) -> Result<ExitStatus, SessionError> {
        if Handle::try_current().is_ok() {
            return Err(SessionError::TerminateFromWorker);
        }
        self.transition(RunState::Terminated)?;

        let (bound, regular): (Vec<_>, Vec<_>) = self
            .processors()
            .into_iter()
            .partition(|processor| processor.bind_on_termination());

        let run_id = self.context.run_id().to_string();
        let terminating = SessionTerminating {
            run_id: &run_id,
            processor_count: bound.len() + regular.len(),
            bound_on_termination: bound.len(),
        };
        let span = terminating.span("terminate");
        let _guard = span.enter();
        terminating.log();

        for processor in &bound {
            processor.session_terminating();
        }

        let runtime = self.runtime.lock().take();
        if let Some(runtime) = runtime {
            runtime.block_on(async {
                for processor in regular.iter().chain(bound.iter()) {
                    processor.join().await;
                }
            });
            runtime.shutdown_timeout(Duration::from_secs(GROUP_SHUTDOWN_TIMEOUT_SECS));
        }

        SessionTerminated {
            run_id: &run_id,
            processor_count: bound.len() + regular.len(),
            task_count: self.context.task_count(),
            duration: self.started.elapsed(),
        }
        .log();

        Ok(ExitStatus::Terminated)
    }

    /// End the run now.
    ///
    /// Sets the aborted flag before any processor is told to terminate, then
    /// cancels every processor. Never blocks, so it is safe to call from a
    /// signal handler running on the concurrency group. Aborting twice
    /// returns the same status.
    pub fn abort(&self) -> Result<ExitStatus, SessionError> {
        match self.context.transition(RunState::Running, RunState::Aborted) {
            Ok(()) => {
                self.context.mark_aborted();
            }
            Err(RunState::Aborted) => {
                // The winning abort may not have set the flag yet
                self.context.mark_aborted();
                return Ok(ExitStatus::Aborted);
            }
            Err(found) => return Err(self.rejected(found, RunState::Aborted)),
        }

        let processors = self.processors();
        SessionAborted {
            run_id: &self.context.run_id().to_string(),
            processor_count: processors.len(),
            exit_code: SESSION_ABORTED_EXIT_CODE,
        }
        .log();

        for processor in &processors {
            processor.terminate();
        }

        Ok(ExitStatus::Aborted)
    }

    /// End the run the way it is going: terminate, unless an abort got there
    /// first, in which case the status is `Aborted`.
    pub fn conclude(&self) -> Result<ExitStatus, SessionError> {
        if self.is_aborted() {
            return self.abort();
        }
        match self.terminate() {
            Err(SessionError::InvalidTransition {
                from: RunState::Aborted,
                ..
            }) => Ok(ExitStatus::Aborted),
            result => result,
        }
    }

    /// Lock-free; safe from any thread.
    pub fn is_aborted(&self) -> bool {
        self.context.is_aborted()
    }

    fn transition(&self, to: RunState) -> Result<(), SessionError> {
        self.context
            .transition(RunState::Running, to)
            .map_err(|found| self.rejected(found, to))
    }

    fn rejected(&self, from: RunState, to: RunState) -> SessionError {
        tracing::warn!(
            "{}",
            TransitionRejected {
                run_id: &self.context.run_id().to_string(),
                from: &from.to_string(),
                to: &to.to_string(),
            }
        );
        SessionError::InvalidTransition { from, to }
    }

    pub fn run_id(&self) -> Uuid {
        self.context.run_id()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.context.state()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn default_processor_type(&self) -> &ProcessorType {
        &self.default_type
    }

    pub fn resolver(&self) -> &ProcessorResolver {
        &self.resolver
    }

    /// The handle processors receive in their binding.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Handle of the concurrency group, for spawning work alongside the processors.
    pub fn handle(&self) -> Handle {
        self.context.handle().clone()
    }

    /// Registered processors in creation order.
    pub fn processors(&self) -> Vec<Arc<dyn TaskProcessor>> {
        self.registry
            .lock()
            .iter()
            .map(|entry| Arc::clone(&entry.processor))
            .collect()
    }

    pub fn task_ledger(&self) -> Vec<(ProcessorId, Vec<TaskRun>)> {
        self.context.task_ledger()
    }

    pub fn task_count(&self) -> usize {
        self.context.task_count()
    }

    pub fn report(&self) -> SessionReport {
        let mut ledger = self.context.task_ledger().into_iter().peekable();
        let processors = self
            .registry
            .lock()
            .iter()
            .map(|entry| {
                let id = entry.processor.id();
                let tasks = match ledger.peek() {
                    Some((recorded, _)) if *recorded == id => {
                        ledger.next().map(|(_, runs)| runs).unwrap_or_default()
                    }
                    _ => Vec::new(),
                };
                ProcessorSummary {
                    id,
                    processor_type: entry.processor.type_name().to_string(),
                    bind_on_termination: entry.processor.bind_on_termination(),
                    injection: entry.injection.clone(),
                    tasks,
                }
            })
            .collect::<Vec<_>>();

        SessionReport {
            run_id: self.run_id(),
            state: self.state(),
            aborted: self.is_aborted(),
            pool_size: self.pool_size,
            default_processor: self.default_type.name().to_string(),
            task_count: processors.iter().map(|p| p.tasks.len()).sum(),
            processors,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Never terminated: do not block on in-flight work
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("run_id", &self.run_id())
            .field("state", &self.state())
            .field("pool_size", &self.pool_size)
            .field("default_type", &self.default_type.name())
            .field("processors", &self.registry.lock().len())
            .finish_non_exhaustive()
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(FALLBACK_POOL_SIZE)
}

/// Serializable snapshot of a session, for reporting at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub run_id: Uuid,
    pub state: RunState,
    pub aborted: bool,
    pub pool_size: usize,
    pub default_processor: String,
    pub task_count: usize,
    pub processors: Vec<ProcessorSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorSummary {
    pub id: ProcessorId,
    pub processor_type: String,
    pub bind_on_termination: bool,
    pub injection: InjectionReport,
    pub tasks: Vec<TaskRun>,
}
