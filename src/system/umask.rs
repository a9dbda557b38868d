// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

#[cfg(unix)]
static UMASK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Current file-creation mask of the process
///
/// Read fresh on every call. umask(2) can only be read by replacing it,
/// so the previous value is written straight back while holding a lock
/// that keeps concurrent readers from restoring the temporary value.
#[cfg(unix)]
pub fn umask() -> u32 {
    let _guard = UMASK_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    // SAFETY: umask(2) cannot fail and touches no memory.
    let mask = unsafe { libc::umask(0o022) };
    unsafe { libc::umask(mask) };
    mask as u32
}

#[cfg(not(unix))]
pub fn umask() -> u32 {
    0
}
