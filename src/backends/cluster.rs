// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processors that hand each task to a batch scheduler.
//!
//! The task command is wrapped in the scheduler's blocking submit command
//! (`qsub -sync y`, `srun`, `qsub -W block=true`, `bsub -K`), which then runs
//! locally like any other command. The run ends when the cluster job ends.
//! Cancelling the run kills the submit client, and the scheduler takes care
//! of the job.

use std::time::Duration;

use async_trait::async_trait;

use crate::backends::command::{run_command, shell_quote, CommandLine};
use crate::backends::processor_core::ProcessorCore;
use crate::errors::SubmitError;
use crate::session::injector::{
    expect_duration, expect_string, expect_usize, Attribute, Configurable,
};
use crate::traits::{ProcessorBinding, ProcessorId, TaskProcessor, TaskRun, TaskSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    GridEngine,
    Slurm,
    Pbs,
    Lsf,
}

/// Resource requests shared by every scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterRequest {
    pub queue: Option<String>,
    pub memory: Option<String>,
    pub cpus: Option<usize>,
    pub time: Option<Duration>,
    /// Extra scheduler flags, passed through verbatim.
    pub cluster_options: Option<String>,
}

impl Scheduler {
    /// Full shell command line that submits `command` as a job named `job`
    /// and blocks until it finishes.
    pub fn submit_command(self, request: &ClusterRequest, job: &str, command: &str) -> String {
        let mut args: Vec<String> = Vec::new();

        match self {
            Scheduler::GridEngine => {
                args.extend(["qsub", "-sync", "y", "-cwd", "-V"].map(String::from));
                args.push(format!("-N {}", shell_quote(job)));
                if let Some(queue) = &request.queue {
                    args.push(format!("-q {}", shell_quote(queue)));
                }
                if let Some(memory) = &request.memory {
                    args.push(format!("-l h_vmem={}", shell_quote(memory)));
                }
                if let Some(cpus) = request.cpus {
                    args.push(format!("-pe smp {}", cpus));
                }
                if let Some(time) = request.time {
                    args.push(format!("-l h_rt={}", clock(time)));
                }
            }
            Scheduler::Slurm => {
                args.push("srun".to_string());
                args.push(format!("--job-name={}", shell_quote(job)));
                if let Some(queue) = &request.queue {
                    args.push(format!("--partition={}", shell_quote(queue)));
                }
                if let Some(memory) = &request.memory {
                    args.push(format!("--mem={}", shell_quote(memory)));
                }
                if let Some(cpus) = request.cpus {
                    args.push(format!("--cpus-per-task={}", cpus));
                }
                if let Some(time) = request.time {
                    args.push(format!("--time={}", clock(time)));
                }
            }
            Scheduler::Pbs => {
                args.extend(["qsub", "-W", "block=true", "-V"].map(String::from));
                args.push(format!("-N {}", shell_quote(job)));
                if let Some(queue) = &request.queue {
                    args.push(format!("-q {}", shell_quote(queue)));
                }
                if let Some(memory) = &request.memory {
                    args.push(format!("-l mem={}", shell_quote(memory)));
                }
                if let Some(cpus) = request.cpus {
                    args.push(format!("-l nodes=1:ppn={}", cpus));
                }
                if let Some(time) = request.time {
                    args.push(format!("-l walltime={}", clock(time)));
                }
            }
            Scheduler::Lsf => {
                args.extend(["bsub", "-K"].map(String::from));
                args.push(format!("-J {}", shell_quote(job)));
                if let Some(queue) = &request.queue {
                    args.push(format!("-q {}", shell_quote(queue)));
                }
                if let Some(memory) = &request.memory {
                    args.push(format!("-M {}", shell_quote(memory)));
                }
                if let Some(cpus) = request.cpus {
                    args.push(format!("-n {}", cpus));
                }
                if let Some(time) = request.time {
                    // LSF run limits are whole minutes
                    args.push(format!("-W {}", time.as_secs().div_ceil(60).max(1)));
                }
            }
        }

        if let Some(options) = &request.cluster_options {
            args.push(options.trim().to_string());
        }

        match self {
            // srun runs its arguments directly
            Scheduler::Slurm => {
                args.push(format!("sh -c {}", shell_quote(command)));
                args.join(" ")
            }
            // The others read the job script from stdin
            _ => format!("printf '%s\\n' {} | {}", shell_quote(command), args.join(" ")),
        }
    }
}

fn clock(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Submits every task to one batch scheduler.
pub struct ClusterProcessor {
    core: ProcessorCore,
    scheduler: Scheduler,
    request: ClusterRequest,
}

impl ClusterProcessor {
    pub fn new(binding: ProcessorBinding, scheduler: Scheduler) -> Self {
        Self {
            core: ProcessorCore::new(binding),
            scheduler,
            request: ClusterRequest::default(),
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    pub fn request(&self) -> &ClusterRequest {
        &self.request
    }
}

impl Configurable for ClusterProcessor {
    const ATTRIBUTES: &'static [Attribute<Self>] = &[
        Attribute {
            name: "queue",
            set: |p, v| {
                p.request.queue = Some(expect_string(v)?);
                Ok(())
            },
        },
        Attribute {
            name: "memory",
            set: |p, v| {
                p.request.memory = Some(expect_string(v)?);
                Ok(())
            },
        },
        Attribute {
            name: "cpus",
            set: |p, v| {
                p.request.cpus = Some(expect_usize(v)?);
                Ok(())
            },
        },
        Attribute {
            name: "time",
            set: |p, v| {
                p.request.time = Some(expect_duration(v)?);
                Ok(())
            },
        },
        Attribute {
            name: "cluster_options",
            set: |p, v| {
                p.request.cluster_options = Some(expect_string(v)?);
                Ok(())
            },
        },
    ];
}

#[async_trait]
impl TaskProcessor for ClusterProcessor {
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
        let launched = self
            .scheduler
            .submit_command(&self.request, &spec.name, &spec.command);
        let command = launched.clone();
        let env = self.core.session().env().to_vec();

        self.core.spawn(spec, launched, move |cancel| async move {
            run_command(
                CommandLine {
                    shell: "sh",
                    command: &command,
                    env: &env,
                    passthrough: None,
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
