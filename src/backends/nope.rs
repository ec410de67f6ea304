// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::backends::processor_core::ProcessorCore;
use crate::errors::SubmitError;
use crate::session::injector::{Attribute, Configurable};
use crate::traits::{ProcessorBinding, ProcessorId, TaskOutcome, TaskProcessor, TaskRun, TaskSpec};

/// Records tasks and reports them successful without running anything.
pub struct NopeProcessor {
    core: ProcessorCore,
}

impl NopeProcessor {
    pub fn new(binding: ProcessorBinding) -> Self {
        Self {
            core: ProcessorCore::new(binding),
        }
    }
}

impl Configurable for NopeProcessor {
    const ATTRIBUTES: &'static [Attribute<Self>] = &[];
}

#[async_trait]
impl TaskProcessor for NopeProcessor {
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
        let command = spec.command.clone();
        self.core
            .spawn(spec, command, |_cancel| async { TaskOutcome::Succeeded })
    }

    async fn join(&self) {
        self.core.join().await;
    }

    fn terminate(&self) {
        self.core.terminate();
    }
}
