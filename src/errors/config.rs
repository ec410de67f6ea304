// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while building or normalizing a run configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or absent construction input. Always fatal to session construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration container was supplied at all.
    #[error("Session configuration is absent")]
    Missing,

    /// The configuration document is not a mapping.
    #[error("Session configuration must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// A well-known section exists but is not a mapping.
    #[error("Configuration section '{key}' must be a mapping, found {found}")]
    InvalidSection { key: String, found: &'static str },

    /// A well-known key holds a value that cannot be used.
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported configuration format for '{}' (expected .yaml, .yml or .toml)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
