//! Depth-first tree scanning with hashing and version stamping.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::project::META_DIR;
use crate::rules::IgnoreRules;
use crate::stamp::{StampOutcome, Stamper};
use crate::tree::{EntryKind, TreeEntry};
use fs4::fs_std::FileExt;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// How a scan behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Descend into subdirectories. When false only the root's own files are
    /// visited.
    pub recursive: bool,
    /// Hash only; never rewrite version headers.
    pub dry_run: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            dry_run: false,
        }
    }
}

/// Category of a per-file stamping failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Access,
    Format,
    Overflow,
    Other,
}

/// A file whose version header could not be updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl StampFailure {
    fn new(path: &Path, error: &Error) -> Self {
        let kind = match error {
            Error::Access { .. } | Error::Io { .. } => FailureKind::Access,
            Error::Format { .. } => FailureKind::Format,
            Error::Overflow { .. } => FailureKind::Overflow,
            _ => FailureKind::Other,
        };
        Self {
            path: path.to_path_buf(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Everything one scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// File and symlink entries in depth-first order.
    pub entries: Vec<TreeEntry>,
    /// Headers added or bumped during the scan.
    pub stamped: Vec<StampOutcome>,
    /// Headers that could not be updated.
    pub failures: Vec<StampFailure>,
    /// Files that could not be opened and were left out of hashing.
    pub skipped: Vec<PathBuf>,
}

/// Walks a directory tree, hashing every file and stamping changed sources.
#[derive(Debug, Clone)]
pub struct Scanner {
    rules: IgnoreRules,
    config: Config,
    stamper: Stamper,
    options: ScanOptions,
}

/// Mutable state of a single scan.
struct ScanState<'a> {
    baseline: HashMap<&'a Path, &'a TreeEntry>,
    seen: HashSet<PathBuf>,
    report: ScanReport,
}

impl ScanState<'_> {
    fn push(&mut self, entry: TreeEntry) {
        if self.seen.insert(entry.path.clone()) {
            self.report.entries.push(entry);
        }
    }
}

impl Scanner {
    pub fn new(rules: IgnoreRules, config: Config, options: ScanOptions) -> Result<Self> {
        let stamper = Stamper::from_config(&config)?;
        Ok(Self {
            rules,
            config,
            stamper,
            options,
        })
    }

    /// Scan `root`.
    ///
    /// `baseline` is the previous snapshot. A tracked source file is stamped
    /// only when its hash differs from its baseline entry (or it has none), and
    /// the recorded hash is the one of the stamped content.
    pub fn scan(&self, root: &Path, baseline: &[TreeEntry]) -> Result<ScanReport> {
        let root = std::path::absolute(root).map_err(|e| Error::from_io(root, e))?;
        let metadata = fs::metadata(&root).map_err(|e| Error::from_io(&root, e))?;
        if !metadata.is_dir() {
            return Err(Error::access(&root, "not a directory"));
        }

        let mut state = ScanState {
            baseline: baseline.iter().map(|e| (e.path.as_path(), e)).collect(),
            seen: HashSet::new(),
            report: ScanReport::default(),
        };

        let meta_dir = root.join(META_DIR);
        if self.rules.is_excluded(&root) {
            info!(path = %root.display(), "scan root is excluded by ignore rules");
        } else {
            self.visit_dir(&root, &meta_dir, &mut state);
        }

        let report = state.report;
        info!(
            root = %root.display(),
            files = report.entries.len(),
            stamped = report.stamped.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "scan complete"
        );
        Ok(report)
    }

    fn visit_dir(&self, dir: &Path, meta_dir: &Path, state: &mut ScanState<'_>) {
        let walker = ignore::WalkBuilder::new(dir)
            .max_depth(Some(1)) // Only immediate children
            .standard_filters(false) // Exclusions come from .sb/.ignore only
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut subdirs = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %dir.display(), error = %Error::from(e), "cannot list directory entry");
                    continue;
                }
            };
            let path = entry.path();

            // Skip the directory itself
            if entry.depth() == 0 {
                continue;
            }

            let Some(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                subdirs.push(path.to_path_buf());
                continue;
            }

            if self.rules.is_excluded(path) {
                debug!(path = %path.display(), "ignoring file");
                continue;
            }

            let Some(name) = path.to_str() else {
                warn!(path = %path.display(), "skipping file whose name is not valid UTF-8");
                continue;
            };
            if name.contains(['\n', '\r']) {
                warn!(path = %path.display(), "skipping file with a line break in its name");
                continue;
            }

            if file_type.is_symlink() {
                state.push(TreeEntry::new(path, EntryKind::Symlink, None));
            } else if file_type.is_file() {
                self.visit_file(path, state);
            }
        }

        if !self.options.recursive {
            return;
        }

        for subdir in subdirs {
            if subdir == meta_dir {
                continue;
            }
            if self.rules.is_excluded(&subdir) {
                debug!(path = %subdir.display(), "ignoring directory");
                continue;
            }
            self.visit_dir(&subdir, meta_dir, state);
        }
    }

    fn visit_file(&self, path: &Path, state: &mut ScanState<'_>) {
        if state.seen.contains(path) {
            return;
        }

        let hash = match check_access(path).and_then(|_| Hash::hash_file(path)) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping inaccessible file");
                state.report.skipped.push(path.to_path_buf());
                // Keep the last known state so the file is not reported as removed
                if let Some(previous) = state.baseline.get(path).copied() {
                    state.push(previous.clone());
                }
                return;
            }
        };

        let mut recorded = hash;
        let unchanged = state
            .baseline
            .get(path)
            .is_some_and(|previous| previous.hash == Some(hash));

        if !self.options.dry_run && !unchanged && self.config.is_tracked(path) {
            match self.stamper.stamp_file(path) {
                Ok(outcome) => {
                    recorded = outcome.hash;
                    state.report.stamped.push(outcome);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "version header not updated");
                    let failure = StampFailure::new(path, &e);
                    if failure.kind == FailureKind::Access {
                        // Record the file as not yet stamped so the next run retries
                        let retry = state
                            .baseline
                            .get(path)
                            .map(|previous| (*previous).clone())
                            .unwrap_or_else(|| TreeEntry::new(path, EntryKind::File, None));
                        state.report.failures.push(failure);
                        state.push(retry);
                        return;
                    }
                    state.report.failures.push(failure);
                }
            }
        } else if unchanged {
            debug!(path = %path.display(), "content unchanged");
        }

        state.push(TreeEntry::new(path, EntryKind::File, Some(recorded)));
    }
}

/// Open `path` for reading and take a non-blocking exclusive lock, released
/// on return. Fails when another process holds a lock or the file cannot be
/// opened.
///
/// The trait method is called by path since `std::fs::File` has an inherent
/// `try_lock_exclusive` with a different signature.
pub fn check_access(path: &Path) -> Result<()> {
    let file = fs::File::open(path).map_err(|e| Error::from_io(path, e))?;
    match FileExt::try_lock_exclusive(&file) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::access(path, "file is in use by another process")),
        Err(e) => Err(Error::from_io(path, e)),
    }
}
