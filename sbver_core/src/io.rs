//! Whole-file writes.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// Readers see either the old content or the new content, never a mix. An
/// existing file keeps its permissions.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    let mut temp_file =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::from_io(path, e))?;
    temp_file
        .write_all(contents)
        .and_then(|_| temp_file.flush())
        .map_err(|e| Error::from_io(path, e))?;
    if let Some(permissions) = permissions {
        fs::set_permissions(temp_file.path(), permissions).map_err(|e| Error::from_io(path, e))?;
    }

    temp_file
        .persist(path)
        .map_err(|e| Error::from_io(path, e.error))?;
    Ok(())
}
