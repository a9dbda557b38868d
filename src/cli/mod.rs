// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stagelink.

pub mod init;
pub mod inspect;
pub mod link;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::link::LinkTypes;
use crate::stage::{StageKey, StageType, StageValues};

/// Filesystem links and pipeline stages
#[derive(Parser, Debug)]
#[clap(
    name = "stagelink",
    version,
    about = "Link files into a workspace and scaffold pipeline stages",
    long_about = None,
    after_help = "Examples:\n\
        stagelink init train --cmd 'python train.py'   Add a stage from defaults\n\
        stagelink init -i                              Build a stage interactively\n\
        stagelink link cache/ab12 data/raw.csv         Link using the configured types\n\
        stagelink inspect data/raw.csv                 Show inode and link status\n\n\
        See 'stagelink <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a stage to the pipeline file
    Init {
        /// Stage name (defaults to the stage type)
        name: Option<String>,

        /// Stage type: default or live
        #[clap(long = "type", default_value = "default")]
        stage_type: StageType,

        /// Prompt for every value not given on the command line
        #[clap(short, long)]
        interactive: bool,

        /// Overwrite an existing stage with the same name
        #[clap(short, long)]
        force: bool,

        #[clap(flatten)]
        values: StageArgs,
    },

    /// Link SOURCE to TARGET
    Link {
        /// Existing file to link from
        source: PathBuf,

        /// Path to create
        target: PathBuf,

        /// Comma-separated link types to try in order (reflink, hardlink, symlink, copy)
        #[clap(short = 't', long = "type", env = "STAGELINK_LINK_TYPE")]
        link_types: Option<LinkTypes>,
    },

    /// Show inode and link status of paths
    Inspect {
        /// Paths to inspect
        #[clap(required = true)]
        paths: Vec<PathBuf>,

        /// Output format: text or json
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Stage values given on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct StageArgs {
    /// Command to execute
    #[clap(long)]
    pub cmd: Option<String>,

    /// Path to a code file/directory
    #[clap(long)]
    pub code: Option<String>,

    /// Path to a data file/directory
    #[clap(long)]
    pub data: Option<String>,

    /// Path to a model file/directory
    #[clap(long)]
    pub models: Option<String>,

    /// Path to a parameters file
    #[clap(long)]
    pub params: Option<String>,

    /// Path to a metrics file
    #[clap(long)]
    pub metrics: Option<String>,

    /// Path to a plots file/directory
    #[clap(long)]
    pub plots: Option<String>,

    /// Path to log live metrics outputs
    #[clap(long)]
    pub live: Option<String>,
}

impl StageArgs {
    /// Values that were given, keyed by stage field
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
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

/// Output format for the inspect command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
