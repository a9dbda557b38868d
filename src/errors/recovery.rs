// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from link failures.

use std::io;

use super::FilesystemError;
use crate::link::LinkType;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest a way around a failed link of the given type
    pub fn for_link_failure(link_type: LinkType, error: &FilesystemError) -> Option<Self> {
        if error.is_unsupported() {
            return Some(Self {
                action: "Use a link type the filesystem supports".into(),
                steps: vec![
                    "Copy-on-write clones need btrfs, XFS (reflink=1), APFS or similar".into(),
                    "Hardlinks share storage without copy-on-write protection".into(),
                ],
                commands: vec![
                    "# In .stagelink/config.toml:".into(),
                    "[cache]".into(),
                    "type = \"hardlink,copy\"".into(),
                ],
            });
        }

        match (link_type, error.raw_os_error()) {
            (LinkType::Hardlink, Some(code)) if is_cross_device(code) => Some(Self {
                action: "Keep source and target on the same filesystem".into(),
                steps: vec![
                    "Hardlinks cannot cross filesystem boundaries".into(),
                    "Use a symlink or a copy instead".into(),
                ],
                commands: vec!["stagelink link --type copy <SOURCE> <TARGET>".into()],
            }),
            (_, _) if error.kind() == io::ErrorKind::AlreadyExists => Some(Self {
                action: "Remove the existing target".into(),
                steps: vec!["Link targets must not exist before linking".into()],
                commands: vec![],
            }),
            (LinkType::Symlink, _) if error.kind() == io::ErrorKind::PermissionDenied => {
                Some(Self {
                    action: "Grant permission to create symlinks".into(),
                    steps: vec![
                        "Some platforms require elevated privileges for symlinks".into(),
                        "On Windows, enable Developer Mode".into(),
                    ],
                    commands: vec![],
                })
            }
            _ => None,
        }
    }

    /// Format for display
    pub fn format(&self) -> String {
        let mut output = format!("Suggestion: {}\n", self.action);

        if !self.steps.is_empty() {
            output.push('\n');
            for (i, step) in self.steps.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        if !self.commands.is_empty() {
            output.push('\n');
            for cmd in &self.commands {
                output.push_str(&format!("  {}\n", cmd));
            }
        }

        output
    }
}

#[cfg(unix)]
fn is_cross_device(code: i32) -> bool {
    code == libc::EXDEV
}

#[cfg(windows)]
fn is_cross_device(code: i32) -> bool {
    // ERROR_NOT_SAME_DEVICE
    code == 17
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_code: i32) -> bool {
    false
}
