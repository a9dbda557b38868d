// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! FICLONE-based cloning for Linux

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use super::reflink::clone_into;
use crate::errors::FilesystemError;

pub(super) fn clone_file(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    clone_into(source, target, |src, dst| {
        // SAFETY: both descriptors stay open for the duration of the call.
        let ret = unsafe { libc::ioctl(dst.as_raw_fd(), libc::FICLONE, src.as_raw_fd()) };
        if ret == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    })
}
