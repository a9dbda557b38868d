// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! # stagelink - filesystem links and pipeline stages
//!
//! `stagelink` places files into a workspace without duplicating bytes
//! and scaffolds stages in a declarative pipeline file.
//!
//! ## Features
//!
//! - **Link primitives** - hardlink, symlink and copy-on-write reflink
//! - **Fallback chains** - try `reflink,copy` (or any order) per file
//! - **Introspection** - inode, symlink and hardlink checks
//! - **Stage wizard** - build a stage from defaults, flags or prompts
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a training stage
//! stagelink init train --cmd "python src/train.py"
//!
//! # Link a cached file into the workspace
//! stagelink link .cache/ab/cdef data/raw.csv
//!
//! # Check how a file is stored
//! stagelink inspect data/raw.csv
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod link;
pub mod stage;
pub mod system;
pub mod utils;

// Re-export commonly used types
pub use errors::{FilesystemError, StagelinkError, StagelinkResult};
pub use link::{LinkType, LinkTypes, Linker};
pub use stage::{StageDefinition, StageKey, StageType};
pub use system::System;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
