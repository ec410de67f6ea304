// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::backends::command::{run_command, CommandLine};
use crate::backends::processor_core::ProcessorCore;
use crate::errors::{AttributeError, SubmitError};
use crate::session::injector::{
    expect_string, expect_string_list, expect_usize, Attribute, Configurable,
};
use crate::traits::{ProcessorBinding, ProcessorId, TaskOutcome, TaskProcessor, TaskRun, TaskSpec};

const DEFAULT_SHELL: &str = "sh";

/// Runs task commands as child processes of this host.
///
/// Attributes:
/// - `shell`: interpreter invoked as `<shell> -c <command>` (default `sh`)
/// - `max_forks`: cap on concurrently running commands of this processor
/// - `env_passthrough`: if set, only these inherited variables reach the child
///
/// The session's `env` section is always exported to the child.
pub struct LocalProcessor {
    core: ProcessorCore,
    shell: String,
    max_forks: Option<usize>,
    forks: Option<Arc<Semaphore>>,
    env_passthrough: Option<Vec<String>>,
}

impl LocalProcessor {
    pub fn new(binding: ProcessorBinding) -> Self {
        Self {
            core: ProcessorCore::new(binding),
            shell: DEFAULT_SHELL.to_string(),
            max_forks: None,
            forks: None,
            env_passthrough: None,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn max_forks(&self) -> Option<usize> {
        self.max_forks
    }

    fn set_max_forks(&mut self, value: &serde_yaml::Value) -> Result<(), AttributeError> {
        let forks = expect_usize(value)?;
        if forks == 0 || forks > Semaphore::MAX_PERMITS {
            return Err(AttributeError::InvalidValue {
                reason: format!("max_forks must be between 1 and {}", Semaphore::MAX_PERMITS),
            });
        }
        self.max_forks = Some(forks);
        self.forks = Some(Arc::new(Semaphore::new(forks)));
        Ok(())
    }
}

impl Configurable for LocalProcessor {
    const ATTRIBUTES: &'static [Attribute<Self>] = &[
        Attribute {
            name: "shell",
            set: |p, v| {
                p.shell = expect_string(v)?;
                Ok(())
            },
        },
        Attribute {
            name: "max_forks",
            set: LocalProcessor::set_max_forks,
        },
        Attribute {
            name: "env_passthrough",
            set: |p, v| {
                p.env_passthrough = Some(expect_string_list(v)?);
                Ok(())
            },
        },
    ];
}

#[async_trait]
impl TaskProcessor for LocalProcessor {
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
        let shell = self.shell.clone();
        let env = self.core.session().env().to_vec();
        let passthrough = self.env_passthrough.clone();
        let forks = self.forks.clone();

        self.core.spawn(spec, command.clone(), move |cancel| async move {
            // Held until the command exits
            let _permit = match forks {
                Some(forks) => tokio::select! {
                    permit = forks.acquire_owned() => permit.ok(),
                    _ = cancel.cancelled() => return TaskOutcome::Cancelled,
                },
                None => None,
            };

            run_command(
                CommandLine {
                    shell: &shell,
                    command: &command,
                    env: &env,
                    passthrough: passthrough.as_deref(),
                },
                cancel,
            )
            .await
        })
    }

    async fn join(&self) {
        self.core.join().await;
    }

    fn terminate(&self) {
        self.core.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::TestSession;
    use crate::session::ConfigInjector;

    #[test]
    fn test_attributes_apply() {
        let harness = TestSession::new();
        let mut local = LocalProcessor::new(harness.binding("local"));
        let section: serde_yaml::Mapping = serde_yaml::from_str(
            "shell: bash\nmax_forks: 2\nenv_passthrough: [PATH, HOME]\nqueue: short\n",
        )
        .unwrap();

        let report = ConfigInjector::apply(&mut local, "local", &section);

        assert_eq!(local.shell(), "bash");
        assert_eq!(local.max_forks(), Some(2));
        assert_eq!(
            local.env_passthrough.as_deref(),
            Some(&["PATH".to_string(), "HOME".to_string()][..])
        );
        assert_eq!(report.ignored, vec!["queue"]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_zero_forks_rejected() {
        let harness = TestSession::new();
        let mut local = LocalProcessor::new(harness.binding("local"));
        let section: serde_yaml::Mapping = serde_yaml::from_str("max_forks: 0\n").unwrap();

        let report = ConfigInjector::apply(&mut local, "local", &section);

        assert_eq!(local.max_forks(), None);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "max_forks");
    }

    #[test]
    fn test_forks_limit_still_runs_every_task() {
        let harness = TestSession::new();
        let mut local = LocalProcessor::new(harness.binding("local"));
        let section: serde_yaml::Mapping = serde_yaml::from_str("max_forks: 1\n").unwrap();
        ConfigInjector::apply(&mut local, "local", &section);

        for i in 0..3 {
            local
                .submit(TaskSpec::new(format!("t{}", i), "true"))
                .unwrap();
        }
        harness.block_on(local.join());

        assert_eq!(harness.context.latch().outstanding(), 0);
        assert_eq!(harness.context.task_count(), 3);
    }
}
