//! Backup of the entries that changed in the latest run.
//!
//! The file holds one `name` line followed by one `hash` line per changed
//! entry and is overwritten on every run.

use crate::diff::Change;
use crate::error::{Error, Result};
use crate::io::write_atomic;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A saved name/hash pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub name: String,
    /// Hex digest, empty when the entry was not hashed.
    pub hash: String,
}

impl From<&Change> for BackupRecord {
    fn from(change: &Change) -> Self {
        Self {
            name: change.current.name.clone(),
            hash: change.current.hash_hex(),
        }
    }
}

/// Overwrite the backup at `path` with the given changes.
pub fn write(path: &Path, changes: &[Change]) -> Result<()> {
    let mut out = String::new();
    for record in changes.iter().map(BackupRecord::from) {
        out.push_str(&record.name);
        out.push('\n');
        out.push_str(&record.hash);
        out.push('\n');
    }
    write_atomic(path, out.as_bytes())
}

/// Read the backup at `path`; a missing file has no records.
pub fn read(path: &Path) -> Result<Vec<BackupRecord>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::from_io(path, e)),
    };

    let lines: Vec<&str> = text.lines().collect();
    if lines.len() % 2 != 0 {
        return Err(Error::parse(format!(
            "backup {} has an odd number of lines",
            path.display()
        )));
    }

    Ok(lines
        .chunks(2)
        .map(|pair| BackupRecord {
            name: pair[0].to_string(),
            hash: pair[1].to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::tree::{EntryKind, TreeEntry};
    use tempfile::TempDir;

    fn change(path: &str, content: &[u8]) -> Change {
        Change {
            previous: None,
            current: TreeEntry::new(path, EntryKind::File, Some(Hash::hash_bytes(content))),
        }
    }

    #[test]
    fn test_write_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".sbver_backup");

        write(&path, &[change("/p/a.cs", b"abc"), change("/p/b.cs", b"")]).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a.cs\n900150983cd24fb0d6963f7d28e17f72\nb.cs\nd41d8cd98f00b204e9800998ecf8427e\n"
        );
    }

    #[test]
    fn test_write_overwrites_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".sbver_backup");

        write(&path, &[change("/p/a.cs", b"1"), change("/p/b.cs", b"2")]).unwrap();
        write(&path, &[change("/p/c.cs", b"3")]).unwrap();

        let records = read(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "c.cs");
        assert_eq!(records[0].hash, Hash::hash_bytes(b"3").to_hex());
    }

    #[test]
    fn test_write_empty_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".sbver_backup");

        write(&path, &[change("/p/a.cs", b"1")]).unwrap();
        write(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert!(read(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_and_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".sbver_backup");
        assert!(read(&path).unwrap().is_empty());

        fs::write(&path, "only-a-name\n").unwrap();
        assert!(matches!(read(&path), Err(Error::Parse { .. })));
    }
}
