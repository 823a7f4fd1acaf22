//! Ignore rules loaded from `.sb/.ignore`.
//!
//! Each non-blank, non-comment line is a path relative to the project root.
//! A line containing `*` or `?` is a glob where `*` matches any run of
//! characters (separators included) and `?` matches exactly one. Every other
//! line excludes that exact path and, when it names a directory, everything
//! beneath it. All comparisons ignore case.

use crate::error::{Error, Result};
use crate::project::{IGNORE_FILE, META_DIR};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
enum Rule {
    /// Exact path, stored lowercased with `/` separators.
    Path(String),
    /// Anchored glob over the full normalized path.
    Glob { pattern: String, matcher: GlobMatcher },
}

/// An ordered set of exclusion rules rooted at one directory.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

impl IgnoreRules {
    /// A rule set that excludes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the ignore file of the project rooted at `base`.
    ///
    /// A missing ignore file yields an empty rule set.
    pub fn load(base: &Path) -> Result<Self> {
        let path = base.join(META_DIR).join(IGNORE_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(base, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ignore file, nothing excluded");
                Ok(Self::empty())
            }
            Err(e) => Err(Error::from_io(&path, e)),
        }
    }

    /// Parse ignore-file content, joining every pattern to `base`.
    pub fn parse(base: &Path, content: &str) -> Result<Self> {
        let mut rules = Self::empty();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            rules.add(base, line)?;
        }
        Ok(rules)
    }

    /// Add a single pattern relative to `base`.
    ///
    /// A leading `/` or `\` anchors the pattern at `base` as well; it never
    /// refers to the filesystem root.
    pub fn add(&mut self, base: &Path, pattern: &str) -> Result<()> {
        let relative = pattern.trim_start_matches(['/', '\\']);
        let relative = relative.trim_end_matches(['/', '\\']);
        if relative.is_empty() {
            return Err(Error::invalid_pattern(pattern, "pattern names the project root"));
        }

        let full = format!(
            "{}/{}",
            normalize(base).trim_end_matches('/'),
            relative.replace('\\', "/")
        );

        let rule = if full.contains(['*', '?']) {
            let matcher = GlobBuilder::new(&escape_glob(&full))
                .case_insensitive(true)
                .literal_separator(false)
                .backslash_escape(false)
                .build()
                .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?
                .compile_matcher();
            Rule::Glob {
                pattern: full,
                matcher,
            }
        } else {
            Rule::Path(full.to_lowercase())
        };

        self.rules.push(rule);
        Ok(())
    }

    /// Whether `path` is excluded by any rule.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.rules.is_empty() {
            return false;
        }

        let normalized = normalize(path);
        let lowered = normalized.to_lowercase();

        self.rules.iter().any(|rule| match rule {
            Rule::Path(pattern) => {
                lowered == *pattern
                    || lowered
                        .strip_prefix(pattern.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Rule::Glob { matcher, .. } => matcher.is_match(&normalized),
        })
    }

    /// Patterns in load order, as full normalized paths.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| match rule {
            Rule::Path(p) => p.as_str(),
            Rule::Glob { pattern, .. } => pattern.as_str(),
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Render a path with `/` separators and no trailing separator.
pub(crate) fn normalize(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    match s.trim_end_matches('/') {
        "" => s,
        trimmed => trimmed.to_string(),
    }
}

/// Keep `*` and `?` as wildcards and make every other glob metacharacter literal.
fn escape_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' | ']' | '{' | '}' => {
                out.push('[');
                out.push(c);
                out.push(']');
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn root() -> PathBuf {
        PathBuf::from("/work/project")
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let rules = IgnoreRules::parse(&root(), "\n# comment\n  \nbuild\n  target  \n").unwrap();
        assert_eq!(rules.len(), 2);
        let patterns: Vec<&str> = rules.patterns().collect();
        assert_eq!(patterns, vec!["/work/project/build", "/work/project/target"]);
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let rules = IgnoreRules::parse(&root(), "Build").unwrap();
        assert!(rules.is_excluded(Path::new("/work/project/build")));
        assert!(rules.is_excluded(Path::new("/work/project/BUILD")));
        assert!(!rules.is_excluded(Path::new("/work/project/builder")));
    }

    #[test]
    fn test_directory_prefix_excludes_descendants() {
        let rules = IgnoreRules::parse(&root(), "build").unwrap();
        assert!(rules.is_excluded(Path::new("/work/project/build/out/app.rs")));
        assert!(!rules.is_excluded(Path::new("/work/project/src/build.rs")));
    }

    #[test]
    fn test_leading_separator_is_root_relative() {
        let rules = IgnoreRules::parse(&root(), "/obj\n\\bin\\").unwrap();
        assert!(rules.is_excluded(Path::new("/work/project/obj")));
        assert!(rules.is_excluded(Path::new("/work/project/bin/debug/x.dll")));
    }

    #[test]
    fn test_glob_star_and_question_mark() {
        let rules = IgnoreRules::parse(&root(), "*.log\nsrc/gen?.rs").unwrap();
        assert!(rules.is_excluded(Path::new("/work/project/app.log")));
        assert!(rules.is_excluded(Path::new("/work/project/nested/dir/APP.LOG")));
        assert!(rules.is_excluded(Path::new("/work/project/src/gen1.rs")));
        assert!(!rules.is_excluded(Path::new("/work/project/src/gen12.rs")));
        assert!(!rules.is_excluded(Path::new("/work/project/app.log.txt")));
    }

    #[test]
    fn test_glob_brackets_are_literal() {
        let rules = IgnoreRules::parse(&root(), "data[1]*").unwrap();
        assert!(rules.is_excluded(Path::new("/work/project/data[1].csv")));
        assert!(!rules.is_excluded(Path::new("/work/project/data1.csv")));
    }

    #[test]
    fn test_empty_rules_exclude_nothing() {
        let rules = IgnoreRules::empty();
        assert!(rules.is_empty());
        assert!(!rules.is_excluded(Path::new("/anything")));
    }

    #[test]
    fn test_root_pattern_rejected() {
        assert!(IgnoreRules::parse(&root(), "/").is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path()).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_load_reads_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let meta = temp_dir.path().join(META_DIR);
        fs::create_dir_all(&meta).unwrap();
        fs::write(meta.join(IGNORE_FILE), "# generated\nbuild\n*.tmp\n").unwrap();

        let rules = IgnoreRules::load(temp_dir.path()).unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules.is_excluded(&temp_dir.path().join("build")));
        assert!(rules.is_excluded(&temp_dir.path().join("a").join("b.tmp")));
    }
}
