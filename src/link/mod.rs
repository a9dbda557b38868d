// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Link strategies
//!
//! Choosing *how* a file is materialised is the caller's decision. This
//! module names the strategies, describes what each one guarantees and
//! tries a configured list of them in order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::errors::{FilesystemError, StagelinkError, StagelinkResult};
use crate::system::{self, System};

/// A way of placing `source`'s content at `target`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Reflink,
    Hardlink,
    Symlink,
    Copy,
}

impl LinkType {
    /// All link types, in default preference order
    pub const ALL: [LinkType; 4] = [Self::Reflink, Self::Hardlink, Self::Symlink, Self::Copy];

    /// Source and target must live on one filesystem
    pub fn same_filesystem_only(self) -> bool {
        matches!(self, Self::Reflink | Self::Hardlink)
    }

    /// Target stays readable after the source is deleted
    pub fn survives_source_deletion(self) -> bool {
        !matches!(self, Self::Symlink)
    }

    /// Target shares storage blocks with the source (reflink: until written)
    pub fn shares_storage(self) -> bool {
        matches!(self, Self::Reflink | Self::Hardlink)
    }

    /// Run this link type
    pub fn apply(self, source: &Path, target: &Path) -> Result<(), FilesystemError> {
        match self {
            Self::Reflink => System::reflink(source, target),
            Self::Hardlink => System::hardlink(source, target),
            Self::Symlink => {
                // A relative source would resolve against the target's directory
                let source = std::fs::canonicalize(source)
                    .map_err(|e| FilesystemError::os("symlink", source, e))?;
                System::symlink(&source, target)
            }
            Self::Copy => copy(source, target),
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reflink => write!(f, "reflink"),
            Self::Hardlink => write!(f, "hardlink"),
            Self::Symlink => write!(f, "symlink"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

impl FromStr for LinkType {
    type Err = StagelinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|link_type| link_type.to_string() == name)
            .ok_or(StagelinkError::UnknownLinkType { name })
    }
}

/// Copy content and give the result fresh-file permissions
fn copy(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    debug!("copy {} -> {}", source.display(), target.display());
    std::fs::copy(source, target).map_err(|e| FilesystemError::os("copy", target, e))?;
    system::reset_copy_permissions(target)
}

/// Ordered, non-empty list of link types, written as `"reflink,copy"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTypes(Vec<LinkType>);

impl LinkTypes {
    pub fn new(types: Vec<LinkType>) -> StagelinkResult<Self> {
        if types.is_empty() {
            return Err(StagelinkError::NoLinkTypes);
        }
        Ok(Self(types))
    }

    pub fn as_slice(&self) -> &[LinkType] {
        &self.0
    }
}

impl Default for LinkTypes {
    fn default() -> Self {
        Self(vec![LinkType::Reflink, LinkType::Copy])
    }
}

impl FromStr for LinkTypes {
    type Err = StagelinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let types = s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(LinkType::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(types)
    }
}

impl fmt::Display for LinkTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", names.join(","))
    }
}

impl Serialize for LinkTypes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LinkTypes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Tries each configured link type until one works
pub struct Linker {
    types: LinkTypes,
}

impl Linker {
    pub fn new(types: LinkTypes) -> Self {
        Self { types }
    }

    pub fn types(&self) -> &LinkTypes {
        &self.types
    }

    /// Link `source` to `target`, returning the type that succeeded
    ///
    /// When every type fails, the error of the last one is returned.
    pub fn link(&self, source: &Path, target: &Path) -> StagelinkResult<LinkType> {
        if target.exists() || System::is_symlink(target) {
            return Err(StagelinkError::TargetExists {
                path: target.to_path_buf(),
            });
        }

        let mut last_error = None;
        for &link_type in self.types.as_slice() {
            match link_type.apply(source, target) {
                Ok(()) => {
                    info!(
                        "Linked {} -> {} ({})",
                        source.display(),
                        target.display(),
                        link_type
                    );
                    return Ok(link_type);
                }
                Err(err) => {
                    debug!("{} failed, trying next link type: {}", link_type, err);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(err.into()),
            None => Err(StagelinkError::NoLinkTypes),
        }
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new(LinkTypes::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_link_types() {
        let types: LinkTypes = "reflink, hardlink ,copy".parse().unwrap();
        assert_eq!(
            types.as_slice(),
            &[LinkType::Reflink, LinkType::Hardlink, LinkType::Copy]
        );
        assert_eq!(types.to_string(), "reflink,hardlink,copy");
    }

    #[test]
    fn test_parse_rejects_unknown_and_empty() {
        assert!(matches!(
            "reflink,teleport".parse::<LinkTypes>(),
            Err(StagelinkError::UnknownLinkType { name }) if name == "teleport"
        ));
        assert!(matches!(
            " , ".parse::<LinkTypes>(),
            Err(StagelinkError::NoLinkTypes)
        ));
    }

    #[test]
    fn test_capability_profile() {
        assert!(LinkType::Hardlink.same_filesystem_only());
        assert!(LinkType::Reflink.same_filesystem_only());
        assert!(!LinkType::Symlink.same_filesystem_only());

        assert!(!LinkType::Symlink.survives_source_deletion());
        assert!(LinkType::Copy.survives_source_deletion());

        assert!(LinkType::Hardlink.shares_storage());
        assert!(!LinkType::Copy.shares_storage());
    }

    #[test]
    fn test_linker_falls_back_to_copy() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let target = temp_dir.path().join("b.txt");
        std::fs::write(&source, "hello").unwrap();

        let linker = Linker::default();
        let used = linker.link(&source, &target).unwrap();

        assert!(used == LinkType::Reflink || used == LinkType::Copy);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_linker_refuses_existing_target() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let target = temp_dir.path().join("b.txt");
        std::fs::write(&source, "hello").unwrap();
        std::fs::write(&target, "keep").unwrap();

        let linker = Linker::new("hardlink".parse().unwrap());
        assert!(matches!(
            linker.link(&source, &target),
            Err(StagelinkError::TargetExists { .. })
        ));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep");
    }

    #[test]
    fn test_linker_reports_last_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.txt");
        let target = temp_dir.path().join("b.txt");

        let linker = Linker::new("hardlink,copy".parse().unwrap());
        match linker.link(&source, &target) {
            Err(StagelinkError::Filesystem(FilesystemError::Os { op, .. })) => {
                assert_eq!(op, "copy")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_points_at_absolute_source() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "hello").unwrap();
        let source = temp_dir.path().join("sub").join("..").join("a.txt");
        let target = temp_dir.path().join("sub").join("b.txt");

        LinkType::Symlink.apply(&source, &target).unwrap();

        let stored = std::fs::read_link(&target).unwrap();
        assert!(stored.is_absolute());
        assert_eq!(stored, std::fs::canonicalize(temp_dir.path().join("a.txt")).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_symlink_missing_source_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.txt");
        let target = temp_dir.path().join("b.txt");

        assert!(LinkType::Symlink.apply(&source, &target).is_err());
        assert!(!System::is_symlink(&target));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_gets_fresh_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.txt");
        let target = temp_dir.path().join("b.txt");
        std::fs::write(&source, "hello").unwrap();
        std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o400)).unwrap();

        LinkType::Copy.apply(&source, &target).unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, system::COPY_MODE & !system::umask());
    }
}
