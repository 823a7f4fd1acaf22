//! Four-part version numbers and the rollover increment.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Upper bounds for the rolling components of a version.
///
/// `major` has no ceiling; it only stops at the limit of its integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ceilings {
    pub revision: u32,
    pub build: u32,
    pub minor: u32,
}

impl Default for Ceilings {
    fn default() -> Self {
        Self {
            revision: 99,
            build: 99,
            minor: 12,
        }
    }
}

/// Component of a version that an explicit bump targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Major,
    Minor,
    Build,
    Revision,
}

/// A `Major.Minor.Build.Revision` version.
///
/// Field order matters: the derived ordering is lexicographic over
/// (major, minor, build, revision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl VersionNumber {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Return the next version, rolling each component over into the one above
    /// it when it passes its ceiling.
    pub fn increment(&self, ceilings: &Ceilings) -> Result<Self> {
        let mut next = *self;

        next.revision = next.revision.saturating_add(1);
        if next.revision > ceilings.revision {
            next.revision = 0;
            next.build = next.build.saturating_add(1);
        }
        if next.build > ceilings.build {
            next.build = 0;
            next.minor = next.minor.saturating_add(1);
        }
        if next.minor > ceilings.minor {
            next.minor = 0;
            next.major = self.major.checked_add(1).ok_or_else(|| Error::overflow(self))?;
        }

        Ok(next)
    }

    /// Explicitly bump one component.
    ///
    /// Bumping the revision uses the rollover rules; bumping a higher component
    /// resets every component below it.
    pub fn bump(&self, component: Component, ceilings: &Ceilings) -> Result<Self> {
        match component {
            Component::Revision => self.increment(ceilings),
            Component::Build => {
                let next = Self::new(self.major, self.minor, self.build.saturating_add(1), 0);
                if next.build > ceilings.build {
                    Self::new(self.major, self.minor, ceilings.build, 0).roll_minor(self, ceilings)
                } else {
                    Ok(next)
                }
            }
            Component::Minor => Self::new(self.major, self.minor, 0, 0).roll_minor(self, ceilings),
            Component::Major => {
                let major = self.major.checked_add(1).ok_or_else(|| Error::overflow(self))?;
                Ok(Self::new(major, 0, 0, 0))
            }
        }
    }

    fn roll_minor(&self, original: &Self, ceilings: &Ceilings) -> Result<Self> {
        let minor = self.minor.saturating_add(1);
        if minor > ceilings.minor {
            let major = self
                .major
                .checked_add(1)
                .ok_or_else(|| Error::overflow(original))?;
            Ok(Self::new(major, 0, 0, 0))
        } else {
            Ok(Self::new(self.major, minor, 0, 0))
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for VersionNumber {
    type Err = Error;

    /// Parse `Major.Minor.Build.Revision`, surrounding whitespace allowed.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 4 {
            return Err(Error::format(format!(
                "expected four dot-separated components, got '{}'",
                trimmed
            )));
        }

        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::format(format!(
                    "component '{}' of '{}' is not a non-negative integer",
                    part, trimmed
                )));
            }
            *value = part.parse().map_err(|_| {
                Error::format(format!(
                    "component '{}' of '{}' is out of range",
                    part, trimmed
                ))
            })?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}
