// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Maps backend names and plugin identifiers to processor types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_yaml::Mapping;

use crate::backends::ProcessorKind;
use crate::errors::ProcessorTypeNotFound;
use crate::observability::messages::processor::{ProcessorTypeResolved, ProcessorTypeUnresolved};
use crate::observability::messages::StructuredLog;
use crate::session::injector::{ConfigInjector, Configurable, InjectionReport};
use crate::traits::{ProcessorBinding, TaskProcessor};

/// Builds a configured processor from its binding and the `task` section.
pub type ProcessorFactory = Arc<
    dyn Fn(ProcessorBinding, &Mapping) -> (Arc<dyn TaskProcessor>, InjectionReport) + Send + Sync,
>;

/// Wrap a constructor into a factory that also runs the config injector.
pub fn factory<P, F>(construct: F) -> ProcessorFactory
where
    P: TaskProcessor + Configurable,
    F: Fn(ProcessorBinding) -> P + Send + Sync + 'static,
{
    Arc::new(move |binding: ProcessorBinding, section: &Mapping| {
        let type_name = binding.type_name.clone();
        let mut processor = construct(binding);
        let report = ConfigInjector::apply(&mut processor, &type_name, section);
        (Arc::new(processor) as Arc<dyn TaskProcessor>, report)
    })
}

/// A resolved processor type: its canonical name and how to build one.
///
/// Two types are equal when their canonical names are.
#[derive(Clone)]
pub struct ProcessorType {
    name: String,
    kind: Option<ProcessorKind>,
    factory: ProcessorFactory,
}

impl ProcessorType {
    pub fn builtin(kind: ProcessorKind) -> Self {
        Self {
            name: kind.name().to_string(),
            kind: Some(kind),
            factory: kind.factory(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The built-in kind, or `None` for a plugin.
    pub fn kind(&self) -> Option<ProcessorKind> {
        self.kind
    }

    pub fn instantiate(
        &self,
        binding: ProcessorBinding,
        section: &Mapping,
    ) -> (Arc<dyn TaskProcessor>, InjectionReport) {
        (self.factory)(binding, section)
    }
}

impl PartialEq for ProcessorType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ProcessorType {}

impl fmt::Debug for ProcessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Resolves processor names.
///
/// Resolution order:
/// 1. empty or missing name: the local processor
/// 2. built-in alias, case-insensitive (`local`, `sge`/`oge`/`uge`, `slurm`,
///    `pbs`/`torque`, `lsf`, `nope`)
/// 3. registered plugin, by exact identifier
///
/// A plugin registered under a built-in alias is never reached.
#[derive(Clone, Default)]
pub struct ProcessorResolver {
    plugins: HashMap<String, ProcessorFactory>,
}

impl ProcessorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `identifier` resolvable to processors built by `factory`.
    ///
    /// Replaces any plugin previously registered under the same identifier.
    pub fn register(&mut self, identifier: impl Into<String>, factory: ProcessorFactory) -> &mut Self {
        self.plugins.insert(identifier.into(), factory);
        self
    }

    pub fn plugin_identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn resolve(&self, name: Option<&str>) -> Result<ProcessorType, ProcessorTypeNotFound> {
        let requested = name.unwrap_or_default();
        let trimmed = requested.trim();

        let resolved = if trimmed.is_empty() {
            Some(ProcessorType::builtin(ProcessorKind::Local))
        } else if let Some(kind) = ProcessorKind::from_alias(trimmed) {
            Some(ProcessorType::builtin(kind))
        } else {
            self.plugins.get(trimmed).map(|factory| ProcessorType {
                name: trimmed.to_string(),
                kind: None,
                factory: Arc::clone(factory),
            })
        };

        match resolved {
            Some(processor_type) => {
                ProcessorTypeResolved {
                    requested,
                    resolved: processor_type.name(),
                }
                .log();
                Ok(processor_type)
            }
            None => {
                ProcessorTypeUnresolved { requested }.log();
                Err(ProcessorTypeNotFound {
                    name: requested.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for ProcessorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorResolver")
            .field("plugins", &self.plugin_identifiers())
            .finish()
    }
}
