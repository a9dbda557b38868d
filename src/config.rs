// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Configuration loading
//!
//! Settings come from `config.toml` files at two levels, merged key by key:
//! the user's global config directory, then `<repo>/.stagelink/`.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{StagelinkError, StagelinkResult};
use crate::link::LinkTypes;
use crate::stage::{StageKey, StageValues};

/// Name of the config file at every level
pub const CONFIG_FILE: &str = "config.toml";

/// Repository-local config directory
pub const LOCAL_DIR: &str = ".stagelink";

/// Merged configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How files are placed in the workspace
    #[serde(default)]
    pub cache: CacheConfig,

    /// Pipeline file settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Defaults offered by the stage init wizard
    #[serde(default)]
    pub defaults: StageDefaults,
}

/// Cache configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Link types to try, in order
    #[serde(default, rename = "type")]
    pub link_types: LinkTypes,
}

/// Pipeline file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline file, relative to the repository root
    #[serde(default = "default_pipeline_file")]
    pub file: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file: default_pipeline_file(),
        }
    }
}

fn default_pipeline_file() -> PathBuf {
    PathBuf::from("pipeline.yaml")
}

/// Workspace layout assumed by the init wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDefaults {
    pub cmd: Option<String>,
    pub code: Option<String>,
    pub data: Option<String>,
    pub models: Option<String>,
    pub params: Option<String>,
    pub metrics: Option<String>,
    pub plots: Option<String>,
    pub live: Option<String>,
}

impl Default for StageDefaults {
    fn default() -> Self {
        Self {
            cmd: None,
            code: Some("src".into()),
            data: Some("data".into()),
            models: Some("models".into()),
            params: Some("params.yaml".into()),
            metrics: Some("metrics.json".into()),
            plots: Some("plots".into()),
            live: Some("live".into()),
        }
    }
}

impl StageDefaults {
    /// Set values as a key map; empty strings count as unset
    pub fn to_values(&self) -> StageValues {
        [
            (StageKey::Cmd, &self.cmd),
            (StageKey::Code, &self.code),
            (StageKey::Data, &self.data),
            (StageKey::Models, &self.models),
            (StageKey::Params, &self.params),
            (StageKey::Metrics, &self.metrics),
            (StageKey::Plots, &self.plots),
            (StageKey::Live, &self.live),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.clone()))
        })
        .collect()
    }
}

impl Config {
    /// Global config file, if the platform has a config directory
    pub fn global_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stagelink").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Repository-local config file
    pub fn local_path(repo_root: &Path) -> PathBuf {
        repo_root.join(LOCAL_DIR).join(CONFIG_FILE)
    }

    /// Load global then local configuration for `repo_root`
    pub fn load(repo_root: &Path) -> StagelinkResult<Self> {
        let mut paths: Vec<PathBuf> = Self::global_path().into_iter().collect();
        paths.push(Self::local_path(repo_root));
        Self::load_from(&paths)
    }

    /// Merge the given files in order; missing files are skipped
    pub fn load_from(paths: &[PathBuf]) -> StagelinkResult<Self> {
        let mut merged = toml::Table::new();
        let mut last_path: Option<&Path> = None;

        for path in paths {
            if !path.exists() {
                continue;
            }

            let content = std::fs::read_to_string(path).map_err(|e| StagelinkError::FileReadError {
                path: path.clone(),
                error: e.to_string(),
            })?;

            let table: toml::Table =
                toml::from_str(&content).map_err(|e| StagelinkError::InvalidConfig {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            debug!("Loaded config from {}", path.display());
            merge(&mut merged, table);
            last_path = Some(path.as_path());
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| StagelinkError::InvalidConfig {
                path: last_path.map(Path::to_path_buf).unwrap_or_default(),
                message: e.to_string(),
            })
    }
}

/// Overlay `overlay` onto `base`, recursing into tables
fn merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
