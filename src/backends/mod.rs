// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in task processor backends.
//!
//! Every backend name the resolver accepts maps to one `ProcessorKind`:
//!
//! ## Local Backend
//! Runs task commands as child processes of this host (`local`).
//!
//! ## Cluster Backends
//! Wrap each command in the blocking submit command of a batch scheduler:
//! - **GridEngine**: `sge`, `oge`, `uge`
//! - **Slurm**: `slurm`
//! - **PBS/Torque**: `pbs`, `torque`
//! - **LSF**: `lsf`
//!
//! ## Nope Backend
//! Records tasks and completes them at once without running anything (`nope`).
//!
//! ## Stub Backend (Test-Only)
//! `RecordingProcessor` logs every lifecycle call for assertions, and
//! `TestSession` gives processors a session context without a full session.
//! Only available in test builds.
//!
//! # Architecture
//!
//! ```text
//! name → ProcessorResolver → ProcessorType { factory } → processor + ConfigInjector
//! ```
//!
//! All built-ins share `processor_core::ProcessorCore`, which records each run with
//! the session, counts it on the completion latch and spawns it on the
//! session's concurrency group.

pub mod cluster;
pub mod command;
pub mod processor_core;
pub mod local;
pub mod nope;
#[cfg(test)]
pub mod stub;

use serde::Serialize;

use crate::backends::cluster::{ClusterProcessor, Scheduler};
use crate::backends::local::LocalProcessor;
use crate::backends::nope::NopeProcessor;
use crate::session::resolver::{factory, ProcessorFactory};

/// The closed set of built-in processor types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    Local,
    GridEngine,
    Slurm,
    Pbs,
    Lsf,
    Nope,
}

impl ProcessorKind {
    pub const ALL: [ProcessorKind; 6] = [
        ProcessorKind::Local,
        ProcessorKind::GridEngine,
        ProcessorKind::Slurm,
        ProcessorKind::Pbs,
        ProcessorKind::Lsf,
        ProcessorKind::Nope,
    ];

    /// Canonical type name, used in logs and as `TaskProcessor::type_name`.
    pub fn name(self) -> &'static str {
        match self {
            ProcessorKind::Local => "local",
            ProcessorKind::GridEngine => "sge",
            ProcessorKind::Slurm => "slurm",
            ProcessorKind::Pbs => "pbs",
            ProcessorKind::Lsf => "lsf",
            ProcessorKind::Nope => "nope",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            ProcessorKind::Local => &["local"],
            ProcessorKind::GridEngine => &["sge", "oge", "uge"],
            ProcessorKind::Slurm => &["slurm"],
            ProcessorKind::Pbs => &["pbs", "torque"],
            ProcessorKind::Lsf => &["lsf"],
            ProcessorKind::Nope => &["nope"],
        }
    }

    /// Case-insensitive alias lookup.
    pub fn from_alias(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| {
            kind.aliases()
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
        })
    }

    pub fn factory(self) -> ProcessorFactory {
        match self {
            ProcessorKind::Local => factory(LocalProcessor::new),
            ProcessorKind::GridEngine => {
                factory(|binding| ClusterProcessor::new(binding, Scheduler::GridEngine))
            }
            ProcessorKind::Slurm => {
                factory(|binding| ClusterProcessor::new(binding, Scheduler::Slurm))
            }
            ProcessorKind::Pbs => factory(|binding| ClusterProcessor::new(binding, Scheduler::Pbs)),
            ProcessorKind::Lsf => factory(|binding| ClusterProcessor::new(binding, Scheduler::Lsf)),
            ProcessorKind::Nope => factory(NopeProcessor::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_alias_maps_back_to_its_kind() {
        for kind in ProcessorKind::ALL {
            for alias in kind.aliases() {
                assert_eq!(ProcessorKind::from_alias(alias), Some(kind));
                assert_eq!(
                    ProcessorKind::from_alias(&alias.to_uppercase()),
                    Some(kind)
                );
            }
            assert!(kind.aliases().contains(&kind.name()));
        }
    }

    #[test]
    fn test_unknown_alias() {
        assert_eq!(ProcessorKind::from_alias("condor"), None);
        assert_eq!(ProcessorKind::from_alias(""), None);
    }
}
