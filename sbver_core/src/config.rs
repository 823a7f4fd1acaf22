//! Project configuration stored in `.sb/config`.
//!
//! The file is a list of `key=value` lines:
//!
//! ```text
//! version=1
//! extensions=rs,cs,c,h
//! comment=//
//! default_version=0.1.0.0
//! revision_ceiling=99
//! build_ceiling=99
//! minor_ceiling=12
//! ```
//!
//! Every key except `version` is optional and falls back to its default.

use crate::error::{Error, Result};
use crate::version::{Ceilings, VersionNumber};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Config format version understood by this build.
pub const CONFIG_VERSION: &str = "1";

/// Extensions tracked when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "cs", "rs", "c", "h", "cpp", "hpp", "java", "js", "ts", "go", "kt", "swift",
];

/// Settings that drive scanning and stamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Lowercase file extensions, without the leading dot, whose files get a
    /// version header.
    pub extensions: Vec<String>,
    /// Comment token a header line starts with.
    pub comment: String,
    /// Version written into files that have no header yet.
    pub default_version: VersionNumber,
    pub ceilings: Ceilings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            comment: "//".to_string(),
            default_version: VersionNumber::new(0, 1, 0, 0),
            ceilings: Ceilings::default(),
        }
    }
}

impl Config {
    /// Read the config file at `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::from_io(path, e)),
        }
    }

    /// Parse config file content.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut version = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(Error::format(format!("config line without '=': {}", line)));
            };
            let value = value.trim();

            match key.trim() {
                "version" => version = Some(value.to_string()),
                "extensions" => config.extensions = parse_extensions(value),
                "comment" => {
                    if value.is_empty() {
                        return Err(Error::format("config key 'comment' cannot be empty"));
                    }
                    config.comment = value.to_string();
                }
                "default_version" => {
                    config.default_version = value.parse().map_err(|e: Error| {
                        Error::format(format!("config key 'default_version': {}", e))
                    })?
                }
                "revision_ceiling" => config.ceilings.revision = parse_ceiling(key, value)?,
                "build_ceiling" => config.ceilings.build = parse_ceiling(key, value)?,
                "minor_ceiling" => config.ceilings.minor = parse_ceiling(key, value)?,
                _ => {}
            }
        }

        if version.as_deref() != Some(CONFIG_VERSION) {
            return Err(Error::format(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        Ok(config)
    }

    /// Render the config in the on-disk format.
    pub fn to_file_content(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "version={}", CONFIG_VERSION);
        let _ = writeln!(out, "extensions={}", self.extensions.join(","));
        let _ = writeln!(out, "comment={}", self.comment);
        let _ = writeln!(out, "default_version={}", self.default_version);
        let _ = writeln!(out, "revision_ceiling={}", self.ceilings.revision);
        let _ = writeln!(out, "build_ceiling={}", self.ceilings.build);
        let _ = writeln!(out, "minor_ceiling={}", self.ceilings.minor);
        out
    }

    /// Whether a file at `path` is a source file that carries a header.
    pub fn is_tracked(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn parse_ceiling(key: &str, value: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::format(format!(
            "config key '{}' must be a positive integer, got '{}'",
            key.trim(),
            value
        ))),
    }
}
