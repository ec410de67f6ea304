// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Applies a flat configuration section to a freshly created processor.
//!
//! Every processor type publishes a static table of attributes, each a name
//! and a typed setter. Injection walks the section, looks each key up in the
//! table and calls the setter. Unknown keys are skipped and a setter that
//! rejects its value only costs that one key.

use std::time::Duration;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::config::consts::PROCESSOR_KEY;
use crate::config::{render_value, value_type_name};
use crate::errors::AttributeError;
use crate::observability::messages::injection::{
    AttributeApplied, AttributeIgnored, AttributeInjectionFailed,
};
use crate::observability::messages::StructuredLog;

/// Setter for one attribute of processor type `P`.
pub type AttributeSetter<P> = fn(&mut P, &Value) -> Result<(), AttributeError>;

/// A named, typed attribute of a processor.
pub struct Attribute<P> {
    pub name: &'static str,
    pub set: AttributeSetter<P>,
}

/// Processor types that accept configuration through the injector.
pub trait Configurable: Sized + 'static {
    const ATTRIBUTES: &'static [Attribute<Self>];

    fn attribute(name: &str) -> Option<&'static Attribute<Self>> {
        Self::ATTRIBUTES.iter().find(|attr| attr.name == name)
    }
}

/// A single key that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeInjectionWarning {
    pub key: String,
    pub value: String,
    pub value_type: &'static str,
    pub cause: String,
}

/// What happened to each key of the section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InjectionReport {
    pub applied: Vec<String>,
    pub ignored: Vec<String>,
    pub failures: Vec<AttributeInjectionWarning>,
}

impl InjectionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ConfigInjector;

impl ConfigInjector {
    /// Apply every key of `section` that names an attribute of `P`.
    ///
    /// Never fails: mismatches are logged at warn level and listed in the
    /// returned report. The `processor` selector key is not an attribute and
    /// is skipped silently.
    pub fn apply<P: Configurable>(
        processor: &mut P,
        processor_type: &str,
        section: &Mapping,
    ) -> InjectionReport {
        let mut report = InjectionReport::default();

        for (key, value) in section {
            let key = match key.as_str() {
                Some(key) => key.to_string(),
                None => render_value(key),
            };
            if key == PROCESSOR_KEY {
                continue;
            }

            let Some(attribute) = P::attribute(&key) else {
                tracing::debug!("{}", AttributeIgnored { processor_type, key: &key });
                report.ignored.push(key);
                continue;
            };

            match (attribute.set)(processor, value) {
                Ok(()) => {
                    tracing::debug!("{}", AttributeApplied { processor_type, key: &key });
                    report.applied.push(key);
                }
                Err(cause) => {
                    let warning = AttributeInjectionWarning {
                        value: render_value(value),
                        value_type: value_type_name(value),
                        cause: cause.to_string(),
                        key,
                    };
                    AttributeInjectionFailed {
                        processor_type,
                        key: &warning.key,
                        value: &warning.value,
                        value_type: warning.value_type,
                        cause: &warning.cause,
                    }
                    .log();
                    report.failures.push(warning);
                }
            }
        }

        report
    }
}

fn mismatch(expected: &'static str, value: &Value) -> AttributeError {
    AttributeError::TypeMismatch {
        expected,
        found: value_type_name(value),
    }
}

pub fn expect_string(value: &Value) -> Result<String, AttributeError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch("string", value))
}

pub fn expect_u64(value: &Value) -> Result<u64, AttributeError> {
    match value {
        Value::Number(n) if n.is_u64() => n.as_u64().ok_or_else(|| mismatch("integer", value)),
        Value::Number(n) if n.is_i64() => Err(AttributeError::InvalidValue {
            reason: format!("must not be negative, got {}", n),
        }),
        _ => Err(mismatch("integer", value)),
    }
}

pub fn expect_usize(value: &Value) -> Result<usize, AttributeError> {
    let raw = expect_u64(value)?;
    usize::try_from(raw).map_err(|_| AttributeError::InvalidValue {
        reason: format!("{} is out of range", raw),
    })
}

pub fn expect_bool(value: &Value) -> Result<bool, AttributeError> {
    value.as_bool().ok_or_else(|| mismatch("boolean", value))
}

/// A sequence whose elements are all strings.
pub fn expect_string_list(value: &Value) -> Result<Vec<String>, AttributeError> {
    let items = value
        .as_sequence()
        .ok_or_else(|| mismatch("sequence", value))?;
    items.iter().map(expect_string).collect()
}

/// A duration given as whole seconds or as a string such as `1500ms`, `90s`,
/// `30m`, `2h` or `1d`. A bare number in a string means seconds.
pub fn expect_duration(value: &Value) -> Result<Duration, AttributeError> {
    match value {
        Value::Number(_) => expect_u64(value).map(Duration::from_secs),
        Value::String(raw) => parse_duration(raw),
        _ => Err(mismatch("duration", value)),
    }
}

fn parse_duration(raw: &str) -> Result<Duration, AttributeError> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let invalid = || AttributeError::InvalidValue {
        reason: format!("'{}' is not a duration (expected e.g. 90s, 30m, 2h)", raw),
    };

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let seconds_per_unit = match unit.trim() {
        "ms" => return Ok(Duration::from_millis(amount)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
