// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::config::RunConfig;
use crate::errors::ConfigError;

/// Load a run configuration from a YAML or TOML file.
///
/// The format is chosen by extension: `.yaml`/`.yml` or `.toml`. An empty
/// document yields an empty configuration; the `task` and `env` sections are
/// normalized either way.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("yaml") | Some("yml") => RunConfig::from_yaml_str(&content),
        Some("toml") => {
            let document: toml::Value = toml::from_str(&content)?;
            let value: Value = serde_yaml::to_value(document)?;
            RunConfig::from_value(value)
        }
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
