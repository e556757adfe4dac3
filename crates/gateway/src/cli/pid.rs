//! Single-instance guard.
//!
//! The server writes its PID to `server.pid_file` and holds an `fs2`
//! exclusive lock on it, so a second launchpad pointed at the same file
//! refuses to start.  [`remove_pid_file`] deletes the file on shutdown.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

/// Lock `path` and write the current PID into it.
///
/// The lock lives as long as the returned handle.
pub fn write_pid_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .read(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("opening PID file {}: {e}", path.display()))?;

    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!(
            "launchpad is already running (PID file {} is locked)",
            path.display()
        )
    })?;

    let pid = std::process::id();
    let mut writer = &file;
    writeln!(writer, "{pid}")?;
    writer.flush()?;

    tracing::info!(path = %path.display(), pid, "PID file written");
    Ok(file)
}

/// Delete the PID file, then release the lock by dropping `_handle`.
pub fn remove_pid_file(path: &Path, _handle: File) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
