// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Filesystem link primitives
//!
//! Stateless wrappers over the host's link system calls. Every call is a
//! single blocking request; nothing is retried and the OS error is kept
//! in the returned [`FilesystemError`].

mod reflink;
mod umask;

#[cfg(target_os = "macos")]
mod darwin;
#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;

pub use reflink::CloneStrategy;
pub use umask::umask;

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::FilesystemError;

/// Permission bits a fresh copy gets before the umask is applied
pub const COPY_MODE: u32 = 0o666;

/// Platform-dispatching link operations
pub struct System;

impl System {
    /// Create `target` as a hardlink to `source`
    pub fn hardlink(source: &Path, target: &Path) -> Result<(), FilesystemError> {
        debug!("hardlink {} -> {}", source.display(), target.display());
        fs::hard_link(source, target).map_err(|e| FilesystemError::os("hardlink", target, e))
    }

    /// Create `target` as a symlink pointing at `source`
    pub fn symlink(source: &Path, target: &Path) -> Result<(), FilesystemError> {
        debug!("symlink {} -> {}", source.display(), target.display());

        #[cfg(unix)]
        let result = std::os::unix::fs::symlink(source, target);

        #[cfg(windows)]
        let result = if source.is_dir() {
            std::os::windows::fs::symlink_dir(source, target)
        } else {
            std::os::windows::fs::symlink_file(source, target)
        };

        #[cfg(not(any(unix, windows)))]
        let result: std::io::Result<()> = Err(std::io::ErrorKind::Unsupported.into());

        result.map_err(|e| FilesystemError::os("symlink", target, e))
    }

    /// Create `target` as a copy-on-write clone of `source`
    ///
    /// The clone inherits the source's mode bits, so they are reset to
    /// [`COPY_MODE`] minus the current umask to look like a normal copy.
    pub fn reflink(source: &Path, target: &Path) -> Result<(), FilesystemError> {
        let strategy = CloneStrategy::host();
        debug!(
            "reflink {} -> {} ({:?})",
            source.display(),
            target.display(),
            strategy
        );

        strategy.clone_file(source, target)?;
        reset_copy_permissions(target)
    }

    /// Storage object identifier of `path`, without following a final symlink
    pub fn inode(path: &Path) -> Result<u64, FilesystemError> {
        let meta = fs::symlink_metadata(path).map_err(|e| FilesystemError::os("lstat", path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Ok(meta.ino())
        }

        #[cfg(not(unix))]
        {
            let _ = meta;
            Err(FilesystemError::unsupported(format!(
                "inode numbers are not available on '{}'",
                std::env::consts::OS
            )))
        }
    }

    /// Whether `path` itself is a symlink; `false` when it does not exist
    pub fn is_symlink(path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
    }

    /// Whether the object behind `path` has more than one directory entry
    pub fn is_hardlink(path: &Path) -> Result<bool, FilesystemError> {
        let meta = fs::metadata(path).map_err(|e| FilesystemError::os("stat", path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Ok(meta.nlink() > 1)
        }

        #[cfg(not(unix))]
        {
            let _ = meta;
            Err(FilesystemError::unsupported(format!(
                "link counts are not available on '{}'",
                std::env::consts::OS
            )))
        }
    }
}

/// Reset `path` to the mode a freshly written file would get
pub(crate) fn reset_copy_permissions(path: &Path) -> Result<(), FilesystemError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = COPY_MODE & !umask();
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| FilesystemError::os("chmod", path, e))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
