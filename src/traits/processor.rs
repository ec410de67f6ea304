use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_yaml::Mapping;

use crate::errors::SubmitError;
use crate::session::SessionContext;

/// Position of a processor in the session registry, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ProcessorId(pub usize);

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session-wide sequence number of a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variables handed over by the script front end for one processor.
///
/// The session stores the binding on the processor and never reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptBinding {
    pub name: String,
    pub variables: Mapping,
}

impl ScriptBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Mapping::new(),
        }
    }
}

/// A unit of work a processor is asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub command: String,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

/// One concrete execution produced by a processor, as recorded in the task ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRun {
    pub id: TaskId,
    pub processor: ProcessorId,
    pub name: String,
    /// The command line actually launched, after any backend wrapping.
    pub command: String,
}

/// How a task run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed { exit_code: i32 },
    Cancelled,
    LaunchFailed(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Succeeded => write!(f, "succeeded"),
            TaskOutcome::Failed { exit_code } => write!(f, "failed with exit code {}", exit_code),
            TaskOutcome::Cancelled => write!(f, "cancelled"),
            TaskOutcome::LaunchFailed(reason) => write!(f, "launch failed: {}", reason),
        }
    }
}

/// Everything a processor receives from the session at creation.
#[derive(Clone)]
pub struct ProcessorBinding {
    pub id: ProcessorId,
    /// Canonical name of the resolved processor type.
    pub type_name: String,
    pub session: SessionContext,
    pub script: Option<ScriptBinding>,
    pub bind_on_termination: bool,
}

impl fmt::Debug for ProcessorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorBinding")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("run_id", &self.session.run_id())
            .field("script", &self.script.as_ref().map(|s| s.name.as_str()))
            .field("bind_on_termination", &self.bind_on_termination)
            .finish()
    }
}

/// Contract between the session and the processors it creates.
///
/// A processor records every task run it starts with the session
/// (`SessionContext::record_task`) and counts it on the session's completion
/// latch until the run ends.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    fn id(&self) -> ProcessorId;

    /// Canonical name of the processor type, e.g. `local` or `sge`.
    fn type_name(&self) -> &str;

    fn bind_on_termination(&self) -> bool;

    /// Start a task run on the session's concurrency group.
    fn submit(&self, spec: TaskSpec) -> Result<TaskRun, SubmitError>;

    /// Stop accepting work and wait for in-flight runs to finish naturally.
    async fn join(&self);

    /// Cancel in-flight runs immediately. Must not block.
    fn terminate(&self);

    /// Called during graceful shutdown, before the join, on processors
    /// created with `bind_on_termination`.
    fn session_terminating(&self) {}
}

impl fmt::Debug for dyn TaskProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskProcessor")
            .field("id", &self.id())
            .field("type_name", &self.type_name())
            .field("bind_on_termination", &self.bind_on_termination())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::nope::NopeProcessor;
    use crate::backends::stub::TestSession;

    #[test]
    fn test_processor_debug_names_id_and_type() {
        let session = TestSession::new();
        let processor: Box<dyn TaskProcessor> =
            Box::new(NopeProcessor::new(session.binding("nope")));

        let rendered = format!("{:?}", processor);
        assert!(rendered.contains("ProcessorId(0)"), "{}", rendered);
        assert!(rendered.contains("\"nope\""), "{}", rendered);
    }
}
