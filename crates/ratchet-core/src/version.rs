//! Strongly-typed migration version.
//!
//! A version is the file name of a migration unit with its suffix removed,
//! e.g. `0001_init` for `0001_init.up.sql`. Versions are compared as plain
//! strings, so `"10_x" < "9_x"`; pick zero-padded or timestamp prefixes when
//! naming migrations.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Non-empty migration version identifier.
///
/// Ordering is byte-wise string ordering, which is also the apply order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::try_new(s).ok_or_else(|| serde::de::Error::custom("Version must not be empty"))
    }
}

impl Version {
    /// Try to create a new `Version`, returning `None` if the string is empty.
    pub fn try_new(version: impl Into<String>) -> Option<Self> {
        let s = version.into();
        if s.is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Return the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for Version {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Version {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Version {
    type Error = &'static str;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Version::try_new(s).ok_or("Version must not be empty")
    }
}

impl PartialEq<str> for Version {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
