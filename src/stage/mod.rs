// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Pipeline stages
//!
//! Builds stage definitions from defaults, overrides and prompts, and
//! writes them into the YAML pipeline file.

mod definition;
mod init;
mod params;
mod prompt;

pub use definition::{Output, OutputFlags, PipelineFile, StageDefinition};
pub use init::{init, init_interactive, InitOptions};
pub use params::load_param_keys;
pub use prompt::{process_response, Prompter, Response, TerminalPrompter};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::{StagelinkError, StagelinkResult};

/// A field the init wizard knows how to fill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageKey {
    Cmd,
    Code,
    Data,
    Models,
    Params,
    Metrics,
    Plots,
    Live,
}

impl StageKey {
    pub const ALL: [StageKey; 8] = [
        Self::Cmd,
        Self::Code,
        Self::Data,
        Self::Models,
        Self::Params,
        Self::Metrics,
        Self::Plots,
        Self::Live,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cmd => "cmd",
            Self::Code => "code",
            Self::Data => "data",
            Self::Models => "models",
            Self::Params => "params",
            Self::Metrics => "metrics",
            Self::Plots => "plots",
            Self::Live => "live",
        }
    }

    /// Question shown when asking for this key
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Cmd => "Command to execute",
            Self::Code => "Path to a code file/directory",
            Self::Data => "Path to a data file/directory",
            Self::Models => "Path to a model file/directory",
            Self::Params => "Path to a parameters file",
            Self::Metrics => "Path to a metrics file",
            Self::Plots => "Path to a plots file/directory",
            Self::Live => "Path to log live metrics outputs",
        }
    }

    /// Only the command has to be answered
    pub fn is_required(self) -> bool {
        self == Self::Cmd
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Unknown stage key: {}", s))
    }
}

/// Values keyed by stage field
pub type StageValues = BTreeMap<StageKey, String>;

/// Kind of stage to scaffold
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    /// Outputs are plain cached outputs, metrics and plots are tracked
    #[default]
    Default,
    /// Models become checkpoints and metrics are logged live
    Live,
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl FromStr for StageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "live" => Ok(Self::Live),
            _ => Err(format!("Unknown stage type: {}", s)),
        }
    }
}

/// Reject names that cannot be used as a stage key or an address
pub fn validate_stage_name(name: &str) -> StagelinkResult<()> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^[^\s/\\:@,;.]+$").expect("Invalid stage name pattern"));

    if pattern.is_match(name) {
        Ok(())
    } else {
        Err(StagelinkError::InvalidStage {
            stage: name.to_string(),
            reason: "names must be non-empty and must not contain whitespace or any of / \\ : @ , ; ."
                .into(),
        })
    }
}
