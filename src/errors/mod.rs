// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Error types
//!
//! Link primitives report [`FilesystemError`], which always keeps the
//! underlying OS error. Everything else in the crate reports
//! [`StagelinkError`].

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stagelink operations
pub type StagelinkResult<T> = Result<T, StagelinkError>;

/// Failure of a single filesystem link primitive
#[derive(Error, Debug, Diagnostic)]
pub enum FilesystemError {
    /// The OS rejected the call
    #[error("{op} '{path}' failed: {source}")]
    #[diagnostic(code(stagelink::filesystem))]
    Os {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copy-on-write cloning is not available on this platform or filesystem
    #[error("reflink is not supported: {reason}")]
    #[diagnostic(
        code(stagelink::reflink_unsupported),
        help("Use a different link type, e.g. set `type = \"hardlink,copy\"` in the [cache] section")
    )]
    Unsupported {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl FilesystemError {
    pub(crate) fn os(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Os {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            source: None,
        }
    }

    /// The OS error code, when the failure came from the OS
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { source, .. } => source.raw_os_error(),
            Self::Unsupported { source, .. } => source.as_ref().and_then(|e| e.raw_os_error()),
        }
    }

    /// Whether this is the `Unsupported` sub-kind
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// The `std::io::ErrorKind` of the underlying error
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Os { source, .. } => source.kind(),
            Self::Unsupported { .. } => io::ErrorKind::Unsupported,
        }
    }
}

/// Main error type for stagelink
#[derive(Error, Debug, Diagnostic)]
pub enum StagelinkError {
    // ─────────────────────────────────────────────────────────────────────────
    // Link Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error("Target '{path}' already exists")]
    #[diagnostic(
        code(stagelink::target_exists),
        help("Remove the target first or choose another path")
    )]
    TargetExists { path: PathBuf },

    #[error("Unknown link type: '{name}'")]
    #[diagnostic(
        code(stagelink::unknown_link_type),
        help("Available link types: reflink, hardlink, symlink, copy")
    )]
    UnknownLinkType { name: String },

    #[error("No link types configured")]
    #[diagnostic(
        code(stagelink::no_link_types),
        help("Set at least one link type, e.g. `type = \"reflink,copy\"`")
    )]
    NoLinkTypes,

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' already exists in '{file}'")]
    #[diagnostic(
        code(stagelink::duplicate_stage),
        help("Use '--force' to overwrite.")
    )]
    DuplicateStage { stage: String, file: String },

    #[error("Stage '{stage}' is invalid: {reason}")]
    #[diagnostic(code(stagelink::invalid_stage))]
    InvalidStage { stage: String, reason: String },

    #[error("Invalid pipeline file '{path}': {reason}")]
    #[diagnostic(code(stagelink::invalid_pipeline))]
    InvalidPipeline { path: PathBuf, reason: String },

    #[error("Aborting ...")]
    #[diagnostic(code(stagelink::aborted))]
    Aborted,

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("File not found: {path}")]
    #[diagnostic(code(stagelink::file_not_found))]
    FileNotFound {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stagelink::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(stagelink::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid configuration in '{path}': {message}")]
    #[diagnostic(code(stagelink::invalid_config))]
    InvalidConfig { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stagelink::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(stagelink::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(stagelink::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(stagelink::toml_error))]
    Toml { message: String },
}

impl From<io::Error> for StagelinkError {
    fn from(e: io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StagelinkError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StagelinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StagelinkError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl StagelinkError {
    /// Create a file not found error for a stage input
    pub fn file_not_found_in_stage(path: PathBuf, stage: &str) -> Self {
        Self::FileNotFound {
            path,
            help: Some(format!(
                "Required by stage '{}'. Check that the file exists.",
                stage
            )),
        }
    }

    /// Create an invalid stage error
    pub fn invalid_stage(stage: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStage {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}
