//! Version header detection and rewriting.
//!
//! A header is the first line that starts with the configured comment token
//! and contains `Version:` followed by four dot-separated integers, e.g.
//! `// Version: 1.0.0.118`. Stamping bumps that line in place, or prepends a
//! fresh header when the file has none. Every other byte of the file,
//! including line terminators, is left as it was.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::io::write_atomic;
use crate::version::{Ceilings, VersionNumber};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where the header of a file stands before stamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    NoHeaderFound,
    HeaderFound {
        /// Zero-based line index of the header.
        line: usize,
        version: VersionNumber,
    },
}

/// Result of stamping text in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped {
    pub text: String,
    /// Version found in the header, `None` if a header was synthesized.
    pub previous: Option<VersionNumber>,
    pub version: VersionNumber,
}

/// Result of stamping a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampOutcome {
    pub path: PathBuf,
    pub previous: Option<VersionNumber>,
    pub version: VersionNumber,
    /// Digest of the content as written.
    pub hash: Hash,
}

/// Parses, increments, and rewrites version headers.
#[derive(Debug, Clone)]
pub struct Stamper {
    token: String,
    default_version: VersionNumber,
    ceilings: Ceilings,
    marker: Regex,
}

impl Stamper {
    pub fn new(token: &str, default_version: VersionNumber, ceilings: Ceilings) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(Error::format("comment token cannot be empty"));
        }
        let marker = Regex::new(&format!(
            r"^{}.*?Version:\s*([0-9]+)\.([0-9]+)\.([0-9]+)\.([0-9]+)",
            regex::escape(token)
        ))
        .map_err(|e| Error::format(format!("invalid comment token '{}': {}", token, e)))?;

        Ok(Self {
            token: token.to_string(),
            default_version,
            ceilings,
            marker,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.comment, config.default_version, config.ceilings)
    }

    /// Render a header line (without terminator) for `version`.
    pub fn header_line(&self, version: &VersionNumber) -> String {
        format!("{} Version: {}", self.token, version)
    }

    /// Locate and parse the header of `text`.
    pub fn inspect(&self, text: &str) -> Result<HeaderState> {
        let (_, body) = split_bom(text);
        Ok(match self.locate(body)? {
            Some(header) => HeaderState::HeaderFound {
                line: header.line,
                version: header.version,
            },
            None => HeaderState::NoHeaderFound,
        })
    }

    /// Stamp `text`, returning the rewritten content.
    ///
    /// A leading byte order mark stays first in the output.
    pub fn apply(&self, text: &str) -> Result<Stamped> {
        let (bom, body) = split_bom(text);
        let mut out = String::with_capacity(text.len() + 32);
        out.push_str(bom);

        if let Some(header) = self.locate(body)? {
            let version = header.version.increment(&self.ceilings)?;
            out.push_str(&body[..header.start]);
            out.push_str(&self.header_line(&version));
            out.push_str(&body[header.end..]);
            return Ok(Stamped {
                text: out,
                previous: Some(header.version),
                version,
            });
        }

        let newline = if body.contains("\r\n") { "\r\n" } else { "\n" };
        let version = self.default_version;
        out.push_str(&self.header_line(&version));
        out.push_str(newline);
        out.push_str(body);
        Ok(Stamped {
            text: out,
            previous: None,
            version,
        })
    }

    /// Stamp a file in place.
    ///
    /// The file is read fully, rewritten in memory, and replaced atomically.
    /// On any error the file on disk is left untouched.
    pub fn stamp_file(&self, path: &Path) -> Result<StampOutcome> {
        let bytes = fs::read(path).map_err(|e| Error::from_io(path, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::format(format!("{} is not valid UTF-8 text", path.display())))?;
        let stamped = self.apply(&text)?;
        write_atomic(path, stamped.text.as_bytes())?;

        match stamped.previous {
            Some(previous) => info!(
                path = %path.display(),
                from = %previous,
                to = %stamped.version,
                "bumped version header"
            ),
            None => info!(
                path = %path.display(),
                version = %stamped.version,
                "added version header"
            ),
        }

        Ok(StampOutcome {
            path: path.to_path_buf(),
            previous: stamped.previous,
            version: stamped.version,
            hash: Hash::hash_bytes(stamped.text.as_bytes()),
        })
    }

    /// First header line of `body`, without its terminator.
    fn locate(&self, body: &str) -> Result<Option<HeaderLine>> {
        let mut offset = 0;
        for (index, line) in body.split_inclusive('\n').enumerate() {
            let content = strip_terminator(line);
            if let Some(caps) = self.marker.captures(content) {
                let raw = format!("{}.{}.{}.{}", &caps[1], &caps[2], &caps[3], &caps[4]);
                return Ok(Some(HeaderLine {
                    line: index,
                    start: offset,
                    end: offset + content.len(),
                    version: raw.parse()?,
                }));
            }
            offset += line.len();
        }
        Ok(None)
    }
}

/// Position and version of a header line.
struct HeaderLine {
    line: usize,
    /// Byte range of the line within the text, terminator excluded.
    start: usize,
    end: usize,
    version: VersionNumber,
}

const BOM: &str = "\u{FEFF}";

fn split_bom(text: &str) -> (&str, &str) {
    match text.strip_prefix(BOM) {
        Some(rest) => (BOM, rest),
        None => ("", text),
    }
}

fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}
