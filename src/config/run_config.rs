// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_yaml::{Mapping, Value};
use uuid::Uuid;

use crate::config::consts::{
    ENV_SECTION, POOL_SIZE_KEY, PROCESSOR_KEY, TASK_SECTION, UNIQUE_ID_KEY,
};
use crate::config::value::{render_value, value_type_name};
use crate::errors::ConfigError;

/// Normalized run configuration owned by a session.
///
/// The `task` and `env` sections always exist after normalization, so readers
/// never have to branch on their presence. Every other key is kept untouched
/// for collaborators outside the session.
///
/// # Example
/// ```yaml
/// poolSize: 8
/// session:
///   uniqueId: 4f7c9a52-1d2e-4c3b-9a8f-0e6d5b4a3c21
/// task:
///   processor: slurm
///   queue: short
///   memory: 4 GB
/// env:
///   REFERENCE: /data/ref.fa
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    root: Mapping,
}

impl RunConfig {
    /// Normalize a raw configuration mapping.
    ///
    /// `None` means no container was supplied and is rejected; an empty
    /// mapping is a valid configuration.
    pub fn normalize(raw: Option<Mapping>) -> Result<Self, ConfigError> {
        let mut root = raw.ok_or(ConfigError::Missing)?;

        for section in [TASK_SECTION, ENV_SECTION] {
            match root.get(section) {
                None | Some(Value::Null) => {
                    root.insert(Value::from(section), Value::Mapping(Mapping::new()));
                }
                Some(Value::Mapping(_)) => {}
                Some(other) => {
                    return Err(ConfigError::InvalidSection {
                        key: section.to_string(),
                        found: value_type_name(other),
                    })
                }
            }
        }

        Ok(Self { root })
    }

    /// Normalize an arbitrary parsed document. A null document is an empty mapping.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Self::normalize(Some(Mapping::new())),
            Value::Mapping(mapping) => Self::normalize(Some(mapping)),
            other => Err(ConfigError::NotAMapping {
                found: value_type_name(&other),
            }),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    /// An empty, already normalized configuration.
    pub fn empty() -> Self {
        let mut root = Mapping::new();
        root.insert(Value::from(TASK_SECTION), Value::Mapping(Mapping::new()));
        root.insert(Value::from(ENV_SECTION), Value::Mapping(Mapping::new()));
        Self { root }
    }

    /// Look up a value by key or dotted path.
    ///
    /// A literal key containing dots wins over walking nested mappings.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.root.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    pub fn task(&self) -> &Mapping {
        self.section(TASK_SECTION)
    }

    pub fn env(&self) -> &Mapping {
        self.section(ENV_SECTION)
    }

    fn section(&self, key: &str) -> &Mapping {
        // normalize() guarantees both sections are mappings
        static EMPTY: std::sync::OnceLock<Mapping> = std::sync::OnceLock::new();
        self.root
            .get(key)
            .and_then(Value::as_mapping)
            .unwrap_or_else(|| EMPTY.get_or_init(Mapping::new))
    }

    /// The `task.processor` selector, if configured.
    pub fn processor_name(&self) -> Result<Option<&str>, ConfigError> {
        match self.task().get(PROCESSOR_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => Ok(Some(name.as_str())),
            Some(other) => Err(ConfigError::InvalidValue {
                key: format!("{}.{}", TASK_SECTION, PROCESSOR_KEY),
                reason: format!("expected string, found {}", value_type_name(other)),
            }),
        }
    }

    /// Explicit pool size, if configured. Must be a positive integer.
    pub fn pool_size(&self) -> Result<Option<usize>, ConfigError> {
        let Some(value) = self.get(POOL_SIZE_KEY) else {
            return Ok(None);
        };

        match value.as_u64() {
            Some(n) if n > 0 => usize::try_from(n).map(Some).map_err(|_| ConfigError::InvalidValue {
                key: POOL_SIZE_KEY.to_string(),
                reason: format!("{} is out of range", n),
            }),
            _ => Err(ConfigError::InvalidValue {
                key: POOL_SIZE_KEY.to_string(),
                reason: format!(
                    "expected a positive integer, found {} '{}'",
                    value_type_name(value),
                    render_value(value)
                ),
            }),
        }
    }

    /// Caller-supplied run identifier, if configured.
    pub fn unique_id(&self) -> Result<Option<Uuid>, ConfigError> {
        match self.get(UNIQUE_ID_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => Uuid::parse_str(raw.trim()).map(Some).map_err(|e| {
                ConfigError::InvalidValue {
                    key: UNIQUE_ID_KEY.to_string(),
                    reason: format!("'{}' is not a valid run identifier: {}", raw, e),
                }
            }),
            Some(other) => Err(ConfigError::InvalidValue {
                key: UNIQUE_ID_KEY.to_string(),
                reason: format!("expected string, found {}", value_type_name(other)),
            }),
        }
    }

    /// Environment section flattened to string pairs, in declaration order.
    ///
    /// Scalars are rendered as text; null values are skipped.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        self.env()
            .iter()
            .filter_map(|(key, value)| {
                let key = key.as_str()?;
                match value {
                    Value::Null => None,
                    other => Some((key.to_string(), render_value(other))),
                }
            })
            .collect()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::empty()
    }
}
