// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Copy-on-write clone dispatch
//!
//! The clone primitive differs per OS family. The strategy is fixed at
//! compile time so callers only ever see [`System::reflink`](super::System::reflink).

use std::path::Path;

#[cfg(unix)]
use std::fs::{self, File, OpenOptions};
#[cfg(unix)]
use std::io;
#[cfg(unix)]
use tracing::debug;

use crate::errors::FilesystemError;

/// How this build clones files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStrategy {
    /// `ioctl(FICLONE)` on an opened target
    LinuxClone,
    /// `clonefile(2)` resolved from the C runtime at call time
    DarwinClone,
    /// No clone primitive on this platform
    Unsupported,
}

impl CloneStrategy {
    /// Strategy for the platform this crate was built for
    pub const fn host() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Self::LinuxClone
        } else if cfg!(target_os = "macos") {
            Self::DarwinClone
        } else {
            Self::Unsupported
        }
    }

    /// Clone `source` into `target` without touching permissions
    pub fn clone_file(self, source: &Path, target: &Path) -> Result<(), FilesystemError> {
        match self {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Self::LinuxClone => super::linux::clone_file(source, target),
            #[cfg(target_os = "macos")]
            Self::DarwinClone => super::darwin::clone_file(source, target),
            _ => {
                let _ = (source, target);
                Err(FilesystemError::unsupported(format!(
                    "reflink is not supported on '{}'",
                    std::env::consts::OS
                )))
            }
        }
    }
}

/// Open both files and run `clone` on them
///
/// If `clone` fails the freshly created target is removed. A failure to
/// remove it is logged and dropped so the clone error is what surfaces.
#[cfg(unix)]
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(super) fn clone_into<F>(source: &Path, target: &Path, clone: F) -> Result<(), FilesystemError>
where
    F: FnOnce(&File, &File) -> io::Result<()>,
{
    let src = File::open(source).map_err(|e| FilesystemError::os("reflink", source, e))?;
    let dst = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .map_err(|e| FilesystemError::os("reflink", target, e))?;

    if let Err(err) = clone(&src, &dst) {
        drop(dst);
        if let Err(cleanup) = fs::remove_file(target) {
            debug!(
                "failed to remove partial reflink target {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(clone_error(target, err));
    }

    Ok(())
}

/// Map a failed clone call, reporting "filesystem can't clone" as `Unsupported`
#[cfg(unix)]
pub(super) fn clone_error(target: &Path, err: io::Error) -> FilesystemError {
    match err.raw_os_error() {
        Some(code) if is_clone_unsupported(code) => FilesystemError::Unsupported {
            reason: format!("cannot clone into '{}': {}", target.display(), err),
            source: Some(err),
        },
        _ => FilesystemError::os("reflink", target, err),
    }
}

#[cfg(unix)]
fn is_clone_unsupported(code: i32) -> bool {
    code == libc::EOPNOTSUPP
        || code == libc::ENOTSUP
        || code == libc::EXDEV
        || code == libc::ENOTTY
        || code == libc::EINVAL
}
