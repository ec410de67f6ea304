pub mod processor;

pub use processor::{
    ProcessorBinding, ProcessorId, ScriptBinding, TaskId, TaskOutcome, TaskProcessor, TaskRun,
    TaskSpec,
};
