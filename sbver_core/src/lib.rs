//! # sbver core
//!
//! Change detection and per-file version stamping for source trees.
//!
//! A scan walks a project depth-first, hashes every file with MD5, and
//! compares the result against the snapshot of the previous run. Tracked
//! source files whose content changed get their version header bumped (or a
//! header prepended when they have none). Changed entries are written to a
//! backup file and the snapshot is replaced once the scan has finished.
//!
//! ## Features
//!
//! - Ignore rules with exact paths and `*`/`?` globs
//! - Four-part `Major.Minor.Build.Revision` versions with configurable rollover
//! - Plain-text snapshot, one tagged record per file
//! - Application-wide version file alongside per-file headers
//!
//! ## Example
//!
//! ```no_run
//! use sbver_core::{Component, Project, ScanOptions, Template};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Set up `.sb/` in the working directory
//! let project = Project::init(Path::new("."), Template::Rust, false, None)?;
//!
//! // Hash, stamp, diff, and persist
//! let report = project.sync(ScanOptions::default())?;
//! for change in &report.changes.changed {
//!     println!("changed: {}", change.current.path.display());
//! }
//!
//! // Bump the application version
//! let version = project.bump_app_version(Component::Build)?;
//! println!("now at {}", version);
//! # Ok(())
//! # }
//! ```

pub mod backup;
mod config;
mod diff;
mod error;
mod hash;
mod io;
mod project;
mod rules;
pub mod snapshot;
mod stamp;
mod tree;
mod version;
mod walk;

pub use backup::BackupRecord;
pub use config::{CONFIG_VERSION, Config, DEFAULT_EXTENSIONS};
pub use diff::{Change, ChangeSet, diff};
pub use error::{Error, Result};
pub use hash::{HASH_SIZE, Hash};
pub use project::{
    BACKUP_FILE, CONFIG_FILE, DEFAULT_APP_VERSION, IGNORE_FILE, META_DIR, Project, SNAPSHOT_FILE,
    SyncReport, Template, VERSION_FILE, Vcs,
};
pub use rules::IgnoreRules;
pub use snapshot::SnapshotStore;
pub use stamp::{HeaderState, StampOutcome, Stamped, Stamper};
pub use tree::{DirRef, EntryKind, TreeEntry};
pub use version::{Ceilings, Component, VersionNumber};
pub use walk::{FailureKind, ScanOptions, ScanReport, Scanner, StampFailure, check_access};
