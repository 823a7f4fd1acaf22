//! Scanned tree entries.

use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of filesystem object an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    /// Name used in the snapshot file.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
        }
    }

    /// Parse the snapshot name of a kind.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "file" => Ok(EntryKind::File),
            "directory" => Ok(EntryKind::Directory),
            "symlink" => Ok(EntryKind::Symlink),
            _ => Err(Error::parse(format!("Invalid entry type: {}", value))),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name and path of the directory that contains an entry.
///
/// This is metadata only; entries do not own or link to each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirRef {
    pub name: String,
    pub path: PathBuf,
}

impl DirRef {
    pub fn of(dir: &Path) -> Self {
        Self {
            name: file_name(dir),
            path: dir.to_path_buf(),
        }
    }
}

/// One scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Final path component.
    pub name: String,
    /// Absolute path, unique within one scan.
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Content digest; `None` when the content was not hashed.
    pub hash: Option<Hash>,
    pub parent: DirRef,
}

impl TreeEntry {
    /// Create an entry for `path`, deriving its name and parent from the path.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind, hash: Option<Hash>) -> Self {
        let path = path.into();
        let parent = path
            .parent()
            .map(DirRef::of)
            .unwrap_or_else(|| DirRef::of(Path::new("")));
        Self {
            name: file_name(&path),
            path,
            kind,
            hash,
            parent,
        }
    }

    /// Hash rendered as hex, or an empty string when absent.
    pub fn hash_hex(&self) -> String {
        self.hash.map(|h| h.to_hex()).unwrap_or_default()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
