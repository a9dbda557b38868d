// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Parameters file loading
//!
//! Only the top-level keys matter: they become the stage's tracked params.

use std::path::Path;

use crate::errors::{StagelinkError, StagelinkResult};

/// Top-level keys of a YAML, JSON or TOML parameters file
pub fn load_param_keys(path: &Path, stage: &str) -> StagelinkResult<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !matches!(ext.as_str(), "yaml" | "yml" | "json" | "toml") {
        return Err(StagelinkError::invalid_stage(
            stage,
            format!(
                "unsupported parameters file '{}' (expected .yaml, .yml, .json or .toml)",
                path.display()
            ),
        ));
    }

    if !path.exists() {
        return Err(StagelinkError::file_not_found_in_stage(
            path.to_path_buf(),
            stage,
        ));
    }

    let content = std::fs::read_to_string(path).map_err(|e| StagelinkError::FileReadError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let keys = match ext.as_str() {
        "json" => match serde_json::from_str::<serde_json::Value>(&content)? {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            serde_json::Value::Null => Vec::new(),
            _ => return Err(not_a_mapping(path, stage)),
        },
        "toml" => {
            let table: toml::Table = toml::from_str(&content)?;
            table.keys().cloned().collect()
        }
        _ => match serde_yaml::from_str::<serde_yaml::Value>(&content)? {
            serde_yaml::Value::Mapping(map) => map
                .keys()
                .map(|key| match key {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim_end().to_string())
                        .unwrap_or_default(),
                })
                .collect(),
            serde_yaml::Value::Null => Vec::new(),
            _ => return Err(not_a_mapping(path, stage)),
        },
    };

    Ok(keys)
}

fn not_a_mapping(path: &Path, stage: &str) -> StagelinkError {
    StagelinkError::invalid_stage(
        stage,
        format!("parameters file '{}' must contain a mapping", path.display()),
    )
}
