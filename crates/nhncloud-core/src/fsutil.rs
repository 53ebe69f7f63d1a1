//! Whole-file persistence helpers.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{NhnError, Result};

/// Owner read/write only.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Owner-only directory.
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Write `contents` to `path` via a temp file in the same directory and a rename,
/// so readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| NhnError::Io(format!("Failed to create directory {}: {}", dir.display(), e)))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| NhnError::Io(format!("Failed to create temp file in {}: {}", dir.display(), e)))?;
    tmp.write_all(contents)?;
    tmp.flush()?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(path)
        .map_err(|e| NhnError::Io(format!("Failed to write {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T, mode: Option<u32>) -> Result<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content, mode)
}

/// Create `dir` (and parents) and restrict it to the owner.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| NhnError::Io(format!("Failed to create directory {}: {}", dir.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(PRIVATE_DIR_MODE))?;
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(NhnError::Io(format!("Failed to remove {}: {}", path.display(), e))),
    }
}
