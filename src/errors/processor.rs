// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for processor resolution, attribute injection and task submission.

use thiserror::Error;

use crate::errors::SessionError;
use crate::traits::ProcessorId;

/// A processor identifier that is neither a built-in alias nor a registered plugin.
///
/// Carries the name exactly as it was requested so operators can spot typos.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Processor type not found: '{name}' is not a built-in alias or registered plugin")]
pub struct ProcessorTypeNotFound {
    pub name: String,
}

/// Why a single attribute setter rejected its value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{reason}")]
    InvalidValue { reason: String },
}

/// Failure to hand a task to a processor.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Session has been aborted; no further tasks are accepted")]
    SessionAborted,

    #[error("Processor {processor} has been joined or terminated; no further tasks are accepted")]
    ProcessorClosed { processor: ProcessorId },

    #[error(transparent)]
    Session(#[from] SessionError),
}
