//! Project layout, initialization, and the scan/diff/persist cycle.
//!
//! A project is a directory holding a `.sb/` metadata directory:
//!
//! ```text
//! .sb/
//!   config         settings (see [`Config`])
//!   .ignore        exclusion rules
//!   .sbver_files   snapshot of the last scan
//!   .sbver_backup  entries that changed in the last scan
//!   .sbver         application version
//! ```

use crate::backup::{self, BackupRecord};
use crate::config::Config;
use crate::diff::{ChangeSet, diff};
use crate::error::{Error, Result};
use crate::io::write_atomic;
use crate::rules::IgnoreRules;
use crate::snapshot::SnapshotStore;
use crate::stamp::StampOutcome;
use crate::tree::TreeEntry;
use crate::version::{Component, VersionNumber};
use crate::walk::{ScanOptions, Scanner, StampFailure};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the metadata directory under the project root.
pub const META_DIR: &str = ".sb";
pub const IGNORE_FILE: &str = ".ignore";
pub const SNAPSHOT_FILE: &str = ".sbver_files";
pub const BACKUP_FILE: &str = ".sbver_backup";
pub const VERSION_FILE: &str = ".sbver";
pub const CONFIG_FILE: &str = "config";

/// Application version assumed before `.sb/.sbver` exists.
pub const DEFAULT_APP_VERSION: VersionNumber = VersionNumber::new(1, 0, 0, 0);

/// Preset settings for a new project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Template {
    #[default]
    Default,
    Rust,
    Dotnet,
    Node,
}

impl Template {
    pub const ALL: [Template; 4] = [Self::Default, Self::Rust, Self::Dotnet, Self::Node];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Rust => "rust",
            Self::Dotnet => "dotnet",
            Self::Node => "node",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::format(format!("unknown template '{}'", name)))
    }

    /// Config written by `init` for this template.
    pub fn config(self) -> Config {
        let extensions: &[&str] = match self {
            Self::Default => return Config::default(),
            Self::Rust => &["rs"],
            Self::Dotnet => &["cs", "fs"],
            Self::Node => &["js", "jsx", "mjs", "cjs", "ts", "tsx"],
        };
        Config {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            ..Config::default()
        }
    }

    /// Patterns written to a fresh ignore file.
    pub fn ignore_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Default => &["*.tmp", "*.bak"],
            Self::Rust => &["target", "*.rs.bk"],
            Self::Dotnet => &["bin", "obj", ".vs", "*.user"],
            Self::Node => &["node_modules", "dist", "coverage"],
        }
    }
}

/// Version control systems whose metadata directory `init` can exclude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vcs {
    Git,
    Svn,
    Hg,
}

impl Vcs {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Svn => "svn",
            Self::Hg => "hg",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "svn" => Ok(Self::Svn),
            "hg" => Ok(Self::Hg),
            _ => Err(Error::format(format!("unknown version control system '{}'", name))),
        }
    }

    pub fn metadata_dir(self) -> &'static str {
        match self {
            Self::Git => ".git",
            Self::Svn => ".svn",
            Self::Hg => ".hg",
        }
    }
}

/// Outcome of one [`Project::sync`] run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub entries: Vec<TreeEntry>,
    pub changes: ChangeSet,
    pub stamped: Vec<StampOutcome>,
    pub failures: Vec<StampFailure>,
    pub skipped: Vec<PathBuf>,
    /// No snapshot existed before this run.
    pub first_run: bool,
    /// Snapshot and backup were written.
    pub persisted: bool,
}

/// An initialized project directory.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Initialize a project at `root`, creating the directory if needed.
    ///
    /// The config is written from `template`; an existing config is only
    /// replaced with `force`. The ignore and application version files are
    /// created when absent and otherwise kept. With `vcs`, the metadata
    /// directory of that system is appended to the ignore file.
    pub fn init(root: &Path, template: Template, force: bool, vcs: Option<Vcs>) -> Result<Self> {
        let root = absolute(root)?;
        let meta_dir = root.join(META_DIR);
        let config_path = meta_dir.join(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(Error::already_initialized(&root));
        }

        fs::create_dir_all(&meta_dir).map_err(|e| Error::from_io(&meta_dir, e))?;

        let config = template.config();
        write_atomic(&config_path, config.to_file_content().as_bytes())?;

        let ignore_path = meta_dir.join(IGNORE_FILE);
        let mut ignore = match fs::read_to_string(&ignore_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => default_ignore_content(template),
            Err(e) => return Err(Error::from_io(&ignore_path, e)),
        };
        if let Some(vcs) = vcs {
            let dir = vcs.metadata_dir();
            if !ignore.lines().any(|line| line.trim() == dir) {
                if !ignore.is_empty() && !ignore.ends_with('\n') {
                    ignore.push('\n');
                }
                ignore.push_str(dir);
                ignore.push('\n');
            }
        }
        write_atomic(&ignore_path, ignore.as_bytes())?;

        let version_path = meta_dir.join(VERSION_FILE);
        if !version_path.exists() {
            write_atomic(&version_path, format!("{}\n", DEFAULT_APP_VERSION).as_bytes())?;
        }

        info!(
            root = %root.display(),
            template = template.as_str(),
            vcs = vcs.map(Vcs::as_str),
            "initialized project"
        );

        Ok(Self { root, config })
    }

    /// Open an initialized project.
    pub fn open(root: &Path) -> Result<Self> {
        let root = absolute(root)?;

        if !root.is_dir() {
            return Err(Error::invalid_project(&root, "directory does not exist"));
        }

        let meta_dir = root.join(META_DIR);
        if !meta_dir.is_dir() {
            return Err(Error::invalid_project(
                &root,
                format!("{} directory not found, run `sbver init`", META_DIR),
            ));
        }

        let config = Config::load(&meta_dir.join(CONFIG_FILE))?;
        debug!(root = %root.display(), "opened project");

        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.meta_dir().join(IGNORE_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.meta_dir().join(BACKUP_FILE)
    }

    pub fn version_path(&self) -> PathBuf {
        self.meta_dir().join(VERSION_FILE)
    }

    pub fn snapshot(&self) -> SnapshotStore {
        SnapshotStore::new(self.meta_dir().join(SNAPSHOT_FILE))
    }

    pub fn rules(&self) -> Result<IgnoreRules> {
        IgnoreRules::load(&self.root)
    }

    pub fn scanner(&self, options: ScanOptions) -> Result<Scanner> {
        Scanner::new(self.rules()?, self.config.clone(), options)
    }

    /// Scan the project, detect changes against the last snapshot, and
    /// persist the result.
    ///
    /// Backup and snapshot are written only after the scan finished, and
    /// never for shallow or dry runs. A failed backup write is logged and
    /// does not prevent the snapshot from being saved.
    pub fn sync(&self, options: ScanOptions) -> Result<SyncReport> {
        let store = self.snapshot();
        let baseline = store.load()?;
        let first_run = baseline.is_empty();

        let scan = self.scanner(options)?.scan(&self.root, &baseline)?;

        let changes = if options.recursive {
            diff(&baseline, &scan.entries)
        } else {
            // A shallow scan only sees the root's own files
            let top_level: Vec<TreeEntry> = baseline
                .iter()
                .filter(|e| e.parent.path == self.root)
                .cloned()
                .collect();
            diff(&top_level, &scan.entries)
        };

        let persisted = options.recursive && !options.dry_run;
        if persisted {
            if let Err(e) = backup::write(&self.backup_path(), &changes.changed) {
                warn!(path = %self.backup_path().display(), error = %e, "failed to write backup");
            }
            store.save(&scan.entries)?;
            debug!(path = %store.path().display(), entries = scan.entries.len(), "saved snapshot");
        }

        Ok(SyncReport {
            entries: scan.entries,
            changes,
            stamped: scan.stamped,
            failures: scan.failures,
            skipped: scan.skipped,
            first_run,
            persisted,
        })
    }

    /// Records of the entries that changed in the last persisted run.
    pub fn backup(&self) -> Result<Vec<BackupRecord>> {
        backup::read(&self.backup_path())
    }

    /// Current application version.
    pub fn app_version(&self) -> Result<VersionNumber> {
        let path = self.version_path();
        match fs::read_to_string(&path) {
            Ok(content) => content.trim().parse(),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DEFAULT_APP_VERSION),
            Err(e) => Err(Error::from_io(&path, e)),
        }
    }

    /// Bump one component of the application version and save it.
    pub fn bump_app_version(&self, component: Component) -> Result<VersionNumber> {
        let current = self.app_version()?;
        let next = current.bump(component, &self.config.ceilings)?;
        self.write_app_version(&next)?;
        info!(from = %current, to = %next, "bumped application version");
        Ok(next)
    }

    /// Replace the application version with `value`.
    pub fn set_app_version(&self, value: &str) -> Result<VersionNumber> {
        let version: VersionNumber = value.trim().parse()?;
        self.write_app_version(&version)?;
        info!(version = %version, "set application version");
        Ok(version)
    }

    fn write_app_version(&self, version: &VersionNumber) -> Result<()> {
        write_atomic(&self.version_path(), format!("{}\n", version).as_bytes())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| Error::from_io(path, e))
}

fn default_ignore_content(template: Template) -> String {
    let mut out = String::from("# Paths excluded from scans, relative to the project root\n");
    for pattern in template.ignore_patterns() {
        let _ = writeln!(out, "{}", pattern);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_init_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();

        let meta = temp_dir.path().join(META_DIR);
        assert!(meta.join(CONFIG_FILE).is_file());
        assert!(meta.join(IGNORE_FILE).is_file());
        assert_eq!(fs::read_to_string(meta.join(VERSION_FILE)).unwrap(), "1.0.0.0\n");
        assert_eq!(project.config(), &Config::default());
        assert_eq!(project.app_version().unwrap(), DEFAULT_APP_VERSION);
    }

    #[test]
    fn test_init_creates_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("new").join("project");
        Project::init(&root, Template::Rust, false, None).unwrap();
        assert!(root.join(META_DIR).join(CONFIG_FILE).is_file());
    }

    #[test]
    fn test_init_twice_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        Project::init(temp_dir.path(), Template::Default, false, None).unwrap();

        let result = Project::init(temp_dir.path(), Template::Rust, false, None);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));

        let project = Project::init(temp_dir.path(), Template::Rust, true, None).unwrap();
        assert_eq!(project.config().extensions, vec!["rs"]);
    }

    #[test]
    fn test_init_force_keeps_ignore_and_version() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        write(&project.ignore_path(), "custom\n");
        project.set_app_version("3.2.1.0").unwrap();

        let project = Project::init(temp_dir.path(), Template::Node, true, None).unwrap();
        assert_eq!(fs::read_to_string(project.ignore_path()).unwrap(), "custom\n");
        assert_eq!(project.app_version().unwrap(), VersionNumber::new(3, 2, 1, 0));
    }

    #[test]
    fn test_init_vcs_adds_metadata_dir_once() {
        let temp_dir = TempDir::new().unwrap();
        Project::init(temp_dir.path(), Template::Rust, false, Some(Vcs::Git)).unwrap();
        let project = Project::init(temp_dir.path(), Template::Rust, true, Some(Vcs::Git)).unwrap();

        let content = fs::read_to_string(project.ignore_path()).unwrap();
        assert_eq!(content.lines().filter(|l| *l == ".git").count(), 1);
        assert!(content.lines().any(|l| l == "target"));
        assert!(project.rules().unwrap().is_excluded(&project.root().join(".git")));
    }

    #[test]
    fn test_template_and_vcs_parse() {
        assert_eq!(Template::parse("DotNet").unwrap(), Template::Dotnet);
        assert!(Template::parse("cobol").is_err());
        assert_eq!(Vcs::parse("SVN").unwrap(), Vcs::Svn);
        assert!(Vcs::parse("cvs").is_err());
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = Project::open(temp_dir.path());
        assert!(matches!(result, Err(Error::InvalidProject { .. })));

        let result = Project::open(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(Error::InvalidProject { .. })));
    }

    #[test]
    fn test_open_reads_config() {
        let temp_dir = TempDir::new().unwrap();
        Project::init(temp_dir.path(), Template::Node, false, None).unwrap();
        let project = Project::open(temp_dir.path()).unwrap();
        assert!(project.config().is_tracked(Path::new("app.tsx")));
        assert!(!project.config().is_tracked(Path::new("main.rs")));
    }

    #[test]
    fn test_sync_twice_without_edits_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        write(&project.root().join("src/Program.cs"), "class Program {}\n");
        write(&project.root().join("README.md"), "# readme\n");

        let first = project.sync(ScanOptions::default()).unwrap();
        assert!(first.first_run);
        assert!(first.persisted);
        assert!(first.changes.is_empty());
        assert_eq!(first.stamped.len(), 1);
        let first_snapshot = project.snapshot().load_text().unwrap().unwrap();

        let second = project.sync(ScanOptions::default()).unwrap();
        assert!(!second.first_run);
        assert!(second.stamped.is_empty());
        assert!(second.changes.is_empty());
        assert_eq!(project.snapshot().load_text().unwrap().unwrap(), first_snapshot);
        assert!(project.backup().unwrap().is_empty());
    }

    #[test]
    fn test_sync_reports_edits_and_writes_backup() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        let program = project.root().join("Program.cs");
        let notes = project.root().join("notes.txt");
        write(&program, "class Program {}\n");
        write(&notes, "one\n");
        project.sync(ScanOptions::default()).unwrap();

        let content = fs::read_to_string(&program).unwrap();
        write(&program, &format!("{content}// more\n"));
        fs::remove_file(&notes).unwrap();
        write(&project.root().join("added.txt"), "new\n");

        let report = project.sync(ScanOptions::default()).unwrap();
        let changed: Vec<&str> = report
            .changes
            .changed
            .iter()
            .map(|c| c.current.name.as_str())
            .collect();
        assert_eq!(changed, vec!["Program.cs", "added.txt"]);
        assert_eq!(report.changes.removed.len(), 1);
        assert_eq!(report.changes.removed[0].name, "notes.txt");

        assert!(fs::read_to_string(&program).unwrap().starts_with("// Version: 0.1.0.1\n"));

        let backup = project.backup().unwrap();
        assert_eq!(backup.len(), 2);
        assert_eq!(backup[0].name, "Program.cs");
        assert_eq!(
            backup[0].hash,
            Hash::hash_bytes(fs::read(&program).unwrap().as_slice()).to_hex()
        );
    }

    #[test]
    fn test_sync_ignored_build_dir_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        write(&project.ignore_path(), "build\n");
        write(&project.root().join("build/out.cs"), "class Out {}\n");
        write(&project.root().join("build/obj/gen.cs"), "class Gen {}\n");
        write(&project.root().join("app.cs"), "class App {}\n");

        let report = project.sync(ScanOptions::default()).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].name, "app.cs");
        assert_eq!(
            fs::read_to_string(project.root().join("build/out.cs")).unwrap(),
            "class Out {}\n"
        );
    }

    #[test]
    fn test_sync_dry_run_and_shallow_do_not_persist() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        write(&project.root().join("top.cs"), "class Top {}\n");
        write(&project.root().join("sub/deep.cs"), "class Deep {}\n");

        let dry = project
            .sync(ScanOptions {
                recursive: true,
                dry_run: true,
            })
            .unwrap();
        assert!(!dry.persisted);
        assert!(project.snapshot().load_text().unwrap().is_none());
        assert_eq!(
            fs::read_to_string(project.root().join("top.cs")).unwrap(),
            "class Top {}\n"
        );

        project.sync(ScanOptions::default()).unwrap();
        let saved = project.snapshot().load_text().unwrap();

        let shallow = project
            .sync(ScanOptions {
                recursive: false,
                dry_run: false,
            })
            .unwrap();
        assert!(!shallow.persisted);
        assert_eq!(shallow.entries.len(), 1);
        // Files below the root are not reported as removed
        assert!(shallow.changes.is_empty());
        assert_eq!(project.snapshot().load_text().unwrap(), saved);
    }

    #[test]
    fn test_sync_recovers_from_corrupt_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        write(&project.root().join("a.txt"), "a");
        write(&project.meta_dir().join(SNAPSHOT_FILE), "file name: a.txt\nnonsense\n");

        let report = project.sync(ScanOptions::default()).unwrap();
        assert!(report.first_run);
        assert_eq!(project.snapshot().load().unwrap(), report.entries);
    }

    #[test]
    fn test_app_version_bump_and_set() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();

        assert_eq!(
            project.bump_app_version(Component::Revision).unwrap(),
            VersionNumber::new(1, 0, 0, 1)
        );
        assert_eq!(
            project.bump_app_version(Component::Minor).unwrap(),
            VersionNumber::new(1, 1, 0, 0)
        );
        assert_eq!(
            project.set_app_version("1.12.99.99").unwrap(),
            VersionNumber::new(1, 12, 99, 99)
        );
        assert_eq!(
            project.bump_app_version(Component::Revision).unwrap(),
            VersionNumber::new(2, 0, 0, 0)
        );
        assert_eq!(fs::read_to_string(project.version_path()).unwrap(), "2.0.0.0\n");

        assert!(matches!(project.set_app_version("1.2.x"), Err(Error::Format { .. })));
        assert_eq!(project.app_version().unwrap(), VersionNumber::new(2, 0, 0, 0));
    }

    #[test]
    fn test_app_version_missing_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let project = Project::init(temp_dir.path(), Template::Default, false, None).unwrap();
        fs::remove_file(project.version_path()).unwrap();
        assert_eq!(project.app_version().unwrap(), DEFAULT_APP_VERSION);
    }
}
