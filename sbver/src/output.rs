//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sbver_core::{
    BackupRecord, EntryKind, FailureKind, Hash, StampFailure, StampOutcome, SyncReport, TreeEntry,
    VersionNumber,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Check if JSON mode is enabled.
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Write output using the configured format.
    ///
    /// The `data` parameter must be a serializable struct that includes
    /// `success: bool` and `result_code: u8` fields.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    /// In text mode, writes the error chain on one line.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
    pub extensions: Vec<String>,
}

/// A scanned entry as reported by `scan`.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<Hash>,
}

impl EntryInfo {
    pub fn new(entry: &TreeEntry, root: &Path) -> Self {
        Self {
            name: entry.name.clone(),
            path: relative(&entry.path, root),
            kind: entry.kind,
            hash: entry.hash,
        }
    }
}

/// A changed entry with its previous and current digests.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeInfo {
    pub path: String,
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<Hash>,
}

/// A version header written during `scan`.
#[derive(Debug, Clone, Serialize)]
pub struct StampInfo {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<VersionNumber>,
    pub version: VersionNumber,
}

impl StampInfo {
    pub fn new(outcome: &StampOutcome, root: &Path) -> Self {
        Self {
            path: relative(&outcome.path, root),
            previous: outcome.previous,
            version: outcome.version,
        }
    }
}

/// A version header that could not be written during `scan`.
#[derive(Debug, Clone, Serialize)]
pub struct FailureInfo {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureInfo {
    pub fn new(failure: &StampFailure, root: &Path) -> Self {
        Self {
            path: relative(&failure.path, root),
            kind: failure.kind,
            message: failure.message.clone(),
        }
    }
}

/// Output for `scan` command.
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub success: bool,
    pub result_code: u8,
    pub root: String,
    pub scanned_at: DateTime<Utc>,
    pub dry_run: bool,
    pub recursive: bool,
    pub first_run: bool,
    pub persisted: bool,
    pub entries: Vec<EntryInfo>,
    pub changed: Vec<ChangeInfo>,
    pub removed: Vec<String>,
    pub stamped: Vec<StampInfo>,
    pub failures: Vec<FailureInfo>,
    pub skipped: Vec<String>,
}

impl ScanOutput {
    pub fn new(report: &SyncReport, root: &Path, dry_run: bool, recursive: bool) -> Self {
        let failed = report
            .failures
            .iter()
            .any(|f| f.kind == FailureKind::Overflow);
        Self {
            success: !failed,
            result_code: if failed { 3 } else { 0 },
            root: root.display().to_string(),
            scanned_at: Utc::now(),
            dry_run,
            recursive,
            first_run: report.first_run,
            persisted: report.persisted,
            entries: report.entries.iter().map(|e| EntryInfo::new(e, root)).collect(),
            changed: report
                .changes
                .changed
                .iter()
                .map(|c| ChangeInfo {
                    path: relative(&c.current.path, root),
                    added: c.is_added(),
                    previous_hash: c.previous.as_ref().and_then(|p| p.hash),
                    hash: c.current.hash,
                })
                .collect(),
            removed: report
                .changes
                .removed
                .iter()
                .map(|e| relative(&e.path, root))
                .collect(),
            stamped: report.stamped.iter().map(|s| StampInfo::new(s, root)).collect(),
            failures: report.failures.iter().map(|f| FailureInfo::new(f, root)).collect(),
            skipped: report.skipped.iter().map(|p| relative(p, root)).collect(),
        }
    }

    /// Human-readable rendering.
    pub fn to_text(&self, show_hashes: bool, show_tree: bool) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Scanned {} files in {} ({} stamped, {} failed, {} skipped)",
            self.entries.len(),
            self.root,
            self.stamped.len(),
            self.failures.len(),
            self.skipped.len()
        );

        if show_tree {
            out.push_str(&render_tree(&self.entries, show_hashes));
        } else if show_hashes {
            for entry in &self.entries {
                let hash = entry.hash.map(|h| h.to_hex()).unwrap_or_default();
                let _ = writeln!(out, "{:32}  {}", hash, entry.path);
            }
        }

        for stamp in &self.stamped {
            match stamp.previous {
                Some(previous) => {
                    let _ = writeln!(out, "stamped  {}  {} -> {}", stamp.path, previous, stamp.version);
                }
                None => {
                    let _ = writeln!(out, "stamped  {}  {} (new header)", stamp.path, stamp.version);
                }
            }
        }
        for failure in &self.failures {
            let _ = writeln!(out, "failed   {}  {}", failure.path, failure.message);
        }
        for path in &self.skipped {
            let _ = writeln!(out, "skipped  {}", path);
        }

        if self.first_run {
            let _ = writeln!(out, "First run, baseline has {} entries", self.entries.len());
        } else if self.changed.is_empty() && self.removed.is_empty() {
            out.push_str("No changes\n");
        } else {
            let _ = writeln!(
                out,
                "Changes: {} changed, {} removed",
                self.changed.len(),
                self.removed.len()
            );
            for change in &self.changed {
                let marker = if change.added { 'A' } else { 'M' };
                let _ = writeln!(out, "  {} {}", marker, change.path);
            }
            for path in &self.removed {
                let _ = writeln!(out, "  D {}", path);
            }
        }

        if self.dry_run {
            out.push_str("Dry run, nothing was written\n");
        } else if !self.recursive {
            out.push_str("Shallow scan, snapshot not updated\n");
        }

        out
    }
}

/// Output for `version show|bump|set` commands.
#[derive(Debug, Serialize)]
pub struct VersionOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<VersionNumber>,
    pub version: VersionNumber,
}

/// Digest of one file for `hash` command.
#[derive(Debug, Clone, Serialize)]
pub struct FileHash {
    pub path: String,
    pub hash: Hash,
}

/// Output for `hash` command.
#[derive(Debug, Serialize)]
pub struct HashOutput {
    pub success: bool,
    pub result_code: u8,
    pub files: Vec<FileHash>,
}

/// Output for `backup` command.
#[derive(Debug, Serialize)]
pub struct BackupOutput {
    pub success: bool,
    pub result_code: u8,
    pub path: String,
    pub records: Vec<BackupRecord>,
}

/// `path` relative to `root` with `/` separators, or unchanged when it lies
/// outside `root`.
pub fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.display().to_string(),
    }
}

#[derive(Default)]
struct DirNode<'a> {
    files: Vec<&'a EntryInfo>,
    dirs: BTreeMap<&'a str, DirNode<'a>>,
}

/// Render entries as an indented directory tree.
fn render_tree(entries: &[EntryInfo], show_hashes: bool) -> String {
    let mut root = DirNode::default();
    for entry in entries {
        let mut node = &mut root;
        let mut parts: Vec<&str> = entry.path.split('/').collect();
        parts.pop();
        for part in parts {
            node = node.dirs.entry(part).or_default();
        }
        node.files.push(entry);
    }

    let mut out = String::new();
    write_node(&mut out, &root, 1, show_hashes);
    out
}

fn write_node(out: &mut String, node: &DirNode<'_>, depth: usize, show_hashes: bool) {
    let indent = "  ".repeat(depth);
    for file in &node.files {
        let suffix = if file.kind == EntryKind::Symlink { " ->" } else { "" };
        match file.hash.filter(|_| show_hashes) {
            Some(hash) => {
                let _ = writeln!(out, "{}{}{}  {}", indent, file.name, suffix, hash);
            }
            None => {
                let _ = writeln!(out, "{}{}{}", indent, file.name, suffix);
            }
        }
    }
    for (name, child) in &node.dirs {
        let _ = writeln!(out, "{}{}/", indent, name);
        write_node(out, child, depth + 1, show_hashes);
    }
}
