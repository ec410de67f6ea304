// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::backends::processor_core::ProcessorCore;
use crate::errors::SubmitError;
use crate::session::injector::{expect_string, Attribute, Configurable};
use crate::session::resolver::{factory, ProcessorFactory};
use crate::session::SessionContext;
use crate::traits::{ProcessorBinding, ProcessorId, TaskOutcome, TaskProcessor, TaskRun, TaskSpec};

/// A bare session context on its own runtime, for exercising processors
/// without a full session.
pub struct TestSession {
    pub runtime: Runtime,
    pub context: SessionContext,
    next_id: std::sync::atomic::AtomicUsize,
}

impl TestSession {
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let context = SessionContext::new(Uuid::new_v4(), runtime.handle().clone(), Vec::new());
        Self {
            runtime,
            context,
            next_id: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Register a new processor slot and return its binding.
    pub fn binding(&self, type_name: &str) -> ProcessorBinding {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.context.register_processor();
        ProcessorBinding {
            id: ProcessorId(id),
            type_name: type_name.to_string(),
            session: self.context.clone(),
            script: None,
            bind_on_termination: false,
        }
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// What a `RecordingProcessor` saw, in the order it saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submitted(ProcessorId, String),
    SessionTerminating(ProcessorId),
    Joined(ProcessorId),
    /// Carries the session's aborted flag as observed inside `terminate`.
    Terminated { processor: ProcessorId, saw_aborted: bool },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// A processor that runs nothing and records every lifecycle call.
///
/// Tasks complete at once with `TaskOutcome::Succeeded`. Its `queue` and
/// `memory` attributes only accept strings.
pub struct RecordingProcessor {
    core: ProcessorCore,
    events: EventLog,
    pub queue: Option<String>,
    pub memory: Option<String>,
}

impl RecordingProcessor {
    pub fn new(binding: ProcessorBinding, events: EventLog) -> Self {
        Self {
            core: ProcessorCore::new(binding),
            events,
            queue: None,
            memory: None,
        }
    }

    /// Factory producing recording processors that share `events`.
    pub fn factory(events: EventLog) -> ProcessorFactory {
        factory(move |binding| RecordingProcessor::new(binding, Arc::clone(&events)))
    }

    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl Configurable for RecordingProcessor {
    const ATTRIBUTES: &'static [Attribute<Self>] = &[
        Attribute {
            name: "queue",
            set: |p, v| {
                p.queue = Some(expect_string(v)?);
                Ok(())
            },
        },
        Attribute {
            name: "memory",
            set: |p, v| {
                p.memory = Some(expect_string(v)?);
                Ok(())
            },
        },
    ];
}

#[async_trait::async_trait]
impl TaskProcessor for RecordingProcessor {
    fn id(&self) -> ProcessorId {
        self.core.id()
    }

    fn type_name(&self) -> &str {
        self.core.type_name()
    }

    fn bind_on_termination(&self) -> bool {
        self.core.bind_on_termination()
    }

    fn submit(&self, spec: TaskSpec) -> Result<TaskRun, SubmitError> {
        self.record(Event::Submitted(self.id(), spec.name.clone()));
        let command = spec.command.clone();
        self.core
            .spawn(spec, command, |_cancel| async { TaskOutcome::Succeeded })
    }

    async fn join(&self) {
        self.core.join().await;
        self.record(Event::Joined(self.id()));
    }

    fn terminate(&self) {
        self.record(Event::Terminated {
            processor: self.id(),
            saw_aborted: self.core.session().is_aborted(),
        });
        self.core.terminate();
    }

    fn session_terminating(&self) {
        self.record(Event::SessionTerminating(self.id()));
    }
}
