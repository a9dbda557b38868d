// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! clonefile(2)-based cloning for macOS
//!
//! `clonefile` is looked up at runtime so builds targeting systems older
//! than APFS still link.

use libloading::{Library, Symbol};
use std::ffi::CString;
use std::io;
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tracing::debug;

use super::reflink::clone_error;
use crate::errors::FilesystemError;

const LIBC: &str = "libc.dylib";
/// Loading by absolute path gets past System Integrity Protection
const LIBC_FALLBACK: &str = "/usr/lib/libSystem.dylib";

type CloneFileFn = unsafe extern "C" fn(*const c_char, *const c_char, u32) -> c_int;

fn load_libc() -> Result<Library, FilesystemError> {
    // SAFETY: the C runtime has no initialisers with preconditions.
    match unsafe { Library::new(LIBC) } {
        Ok(lib) => Ok(lib),
        Err(err) => {
            debug!(
                "unable to access '{}' ({}). Falling back to '{}'.",
                LIBC, err, LIBC_FALLBACK
            );
            unsafe { Library::new(LIBC_FALLBACK) }.map_err(|e| {
                FilesystemError::os(
                    "dlopen",
                    LIBC_FALLBACK,
                    io::Error::new(io::ErrorKind::NotFound, e),
                )
            })
        }
    }
}

fn c_path(path: &Path) -> Result<CString, FilesystemError> {
    CString::new(path.as_os_str().as_bytes()).map_err(|e| {
        FilesystemError::os("reflink", path, io::Error::new(io::ErrorKind::InvalidInput, e))
    })
}

pub(super) fn clone_file(source: &Path, target: &Path) -> Result<(), FilesystemError> {
    let lib = load_libc()?;

    // SAFETY: the signature matches clonefile(2).
    let clonefile: Symbol<CloneFileFn> = unsafe { lib.get(b"clonefile\0") }.map_err(|_| {
        FilesystemError::unsupported("'clonefile' not supported by the standard library")
    })?;

    let src = c_path(source)?;
    let dst = c_path(target)?;

    // SAFETY: both pointers are valid NUL-terminated strings for the call.
    let ret = unsafe { clonefile(src.as_ptr(), dst.as_ptr(), 0) };
    if ret != 0 {
        return Err(clone_error(target, io::Error::last_os_error()));
    }

    Ok(())
}
