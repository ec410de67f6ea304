// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration attribute injection.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A configuration key was applied to a processor attribute.
///
/// # Log Level
/// `debug!` - Per-attribute detail
pub struct AttributeApplied<'a> {
    pub processor_type: &'a str,
    pub key: &'a str,
}

impl Display for AttributeApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Applied attribute '{}' to '{}' processor",
            self.key, self.processor_type
        )
    }
}

/// A configuration key matched no attribute of the processor.
///
/// # Log Level
/// `debug!` - Per-attribute detail
pub struct AttributeIgnored<'a> {
    pub processor_type: &'a str,
    pub key: &'a str,
}

impl Display for AttributeIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring unknown attribute '{}' for '{}' processor",
            self.key, self.processor_type
        )
    }
}

/// A configuration value could not be applied; the key is skipped.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
///
/// # Example
/// ```
/// use pipeline_session::observability::messages::injection::AttributeInjectionFailed;
///
/// let msg = AttributeInjectionFailed {
///     processor_type: "sge",
///     key: "memory",
///     value: "4",
///     value_type: "integer",
///     cause: "expected string, found integer",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct AttributeInjectionFailed<'a> {
    pub processor_type: &'a str,
    pub key: &'a str,
    pub value: &'a str,
    pub value_type: &'a str,
    pub cause: &'a str,
}

impl Display for AttributeInjectionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Unable to set attribute '{}' on '{}' processor with value '{}' [{}]: {}",
            self.key, self.processor_type, self.value, self.value_type, self.cause
        )
    }
}

impl StructuredLog for AttributeInjectionFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            processor_type = self.processor_type,
            key = self.key,
            value = self.value,
            value_type = self.value_type,
            cause = self.cause,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "attribute_injection_failed",
            span_name = name,
            processor_type = self.processor_type,
            key = self.key,
        )
    }
}
