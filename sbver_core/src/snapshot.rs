//! Persisted snapshot of the last scanned tree.
//!
//! The snapshot is plain text, one record per entry:
//!
//! ```text
//! file name: main.rs
//! file path: /work/project/src/main.rs
//! file type: file
//! file hash: 900150983cd24fb0d6963f7d28e17f72
//!
//! ```
//!
//! Records are separated by a blank line and parsed one at a time, so a
//! missing or repeated field is caught in the record where it happens.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::io::write_atomic;
use crate::tree::{DirRef, EntryKind, TreeEntry};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const NAME_TAG: &str = "file name:";
const PATH_TAG: &str = "file path:";
const TYPE_TAG: &str = "file type:";
const HASH_TAG: &str = "file hash:";

/// Render entries in the snapshot format.
pub fn serialize(entries: &[TreeEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "{} {}", NAME_TAG, entry.name);
        let _ = writeln!(out, "{} {}", PATH_TAG, entry.path.display());
        let _ = writeln!(out, "{} {}", TYPE_TAG, entry.kind);
        let _ = writeln!(out, "{} {}", HASH_TAG, entry.hash_hex());
        out.push('\n');
    }
    out
}

/// Parse snapshot text back into entries, in file order.
pub fn deserialize(text: &str) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut record: Vec<&str> = Vec::with_capacity(4);
    let mut record_no = 1;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !record.is_empty() {
                entries.push(parse_record(&record, record_no)?);
                record.clear();
                record_no += 1;
            }
        } else {
            record.push(line);
        }
    }
    if !record.is_empty() {
        entries.push(parse_record(&record, record_no)?);
    }

    Ok(entries)
}

fn parse_record(lines: &[&str], record_no: usize) -> Result<TreeEntry> {
    let mut name = None;
    let mut path = None;
    let mut kind = None;
    let mut hash = None;

    for line in lines {
        let (slot, tag) = if line.starts_with(NAME_TAG) {
            (&mut name, NAME_TAG)
        } else if line.starts_with(PATH_TAG) {
            (&mut path, PATH_TAG)
        } else if line.starts_with(TYPE_TAG) {
            (&mut kind, TYPE_TAG)
        } else if line.starts_with(HASH_TAG) {
            (&mut hash, HASH_TAG)
        } else {
            return Err(Error::parse(format!(
                "record {}: unexpected line '{}'",
                record_no, line
            )));
        };

        if slot.is_some() {
            return Err(Error::parse(format!(
                "record {}: duplicate '{}' field",
                record_no, tag
            )));
        }
        let value = &line[tag.len()..];
        *slot = Some(value.strip_prefix(' ').unwrap_or(value));
    }

    let missing = |tag: &str| Error::parse(format!("record {}: missing '{}' field", record_no, tag));
    let name = name.ok_or_else(|| missing(NAME_TAG))?;
    let path = path.ok_or_else(|| missing(PATH_TAG))?;
    let kind = kind.ok_or_else(|| missing(TYPE_TAG))?;
    let hash = hash.ok_or_else(|| missing(HASH_TAG))?;

    if path.is_empty() {
        return Err(Error::parse(format!("record {}: empty path", record_no)));
    }

    let path = PathBuf::from(path);
    let parent = path
        .parent()
        .map(DirRef::of)
        .unwrap_or_else(|| DirRef::of(Path::new("")));
    let hash = match hash.trim() {
        "" => None,
        hex => Some(
            Hash::from_hex(hex)
                .map_err(|e| Error::parse(format!("record {}: {}", record_no, e)))?,
        ),
    };

    Ok(TreeEntry {
        name: name.to_string(),
        path,
        kind: EntryKind::parse(kind.trim())
            .map_err(|e| Error::parse(format!("record {}: {}", record_no, e)))?,
        hash,
        parent,
    })
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw snapshot text, or `None` if no snapshot has been written yet.
    pub fn load_text(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::from_io(&self.path, e)),
        }
    }

    /// Replace the snapshot with `text`.
    pub fn save_text(&self, text: &str) -> Result<()> {
        write_atomic(&self.path, text.as_bytes())
    }

    /// Load the previous entries.
    ///
    /// A missing snapshot means first run and yields no entries. A corrupt
    /// snapshot is discarded with a warning; the next save establishes a fresh
    /// baseline.
    pub fn load(&self) -> Result<Vec<TreeEntry>> {
        let Some(text) = self.load_text()? else {
            debug!(path = %self.path.display(), "no snapshot yet, first run");
            return Ok(Vec::new());
        };

        match deserialize(&text) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot is corrupt, starting from a fresh baseline"
                );
                Ok(Vec::new())
            }
        }
    }

    pub fn save(&self, entries: &[TreeEntry]) -> Result<()> {
        self.save_text(&serialize(entries))
    }
}
