//! # Module-Relative Paths
//!
//! [`ModulePath`] is a validated, normalized path relative to the root of a
//! module. Overlay keys are always slash-delimited regardless of host, so a
//! `ModulePath` can be joined with source paths without consulting the
//! platform separator.
//!
//! ## Normalization
//!
//! - `\` is treated as a separator and rewritten to `/`.
//! - Empty and `.` components are dropped (`./a//b/` becomes `a/b`).
//! - A leading `/` (or a drive prefix such as `C:`) is rejected.
//! - `..` components are rejected; nothing may escape the module root.
//!
//! Source-relative paths handed to [`ModulePath::join`] are already
//! slash-delimited, so only `/` separates them: `\` and `:` are ordinary
//! name characters there and are kept as they are.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// A non-empty, relative, slash-delimited path inside a module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModulePath(String);

impl ModulePath {
    /// Normalize and validate `raw` as a module path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the path is empty after normalization,
    /// absolute, or contains a `..` component.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PathError> {
        let normalized = normalize(raw.as_ref())?;
        if normalized.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(normalized))
    }

    /// Access the normalized path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relocate a source-relative path under this path.
    ///
    /// `relative` is split on `/` only; empty and `.` components are
    /// dropped and every other name is kept verbatim. An empty or `.`
    /// relative path yields this path unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `relative` starts with `/` or climbs with
    /// `..`.
    pub fn join(&self, relative: &str) -> Result<String, PathError> {
        let tail = normalize_source(relative)?;
        if tail.is_empty() {
            return Ok(self.0.clone());
        }
        Ok(format!("{}/{}", self.0, tail))
    }

    /// Iterate the path's components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

/// Normalize a slash- or backslash-delimited relative path.
///
/// Returns an empty string for paths with no meaningful components.
pub(crate) fn normalize(raw: &str) -> Result<String, PathError> {
    let unified = raw.replace('\\', "/");
    if has_drive_prefix(&unified) {
        return Err(PathError::Absolute(raw.to_string()));
    }
    join_components(&unified, raw)
}

/// Normalize a path reported by a source walk.
///
/// Only `/` separates components. Returns an empty string for paths with
/// no meaningful components.
pub(crate) fn normalize_source(raw: &str) -> Result<String, PathError> {
    join_components(raw, raw)
}

fn join_components(path: &str, raw: &str) -> Result<String, PathError> {
    if path.starts_with('/') {
        return Err(PathError::Absolute(raw.to_string()));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(PathError::ParentComponent(raw.to_string())),
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModulePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModulePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ModulePath {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModulePath> for String {
    fn from(path: ModulePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_relative_path() {
        let path = ModulePath::new("public/schema").unwrap();
        assert_eq!(path.as_str(), "public/schema");
        assert_eq!(path.components().collect::<Vec<_>>(), vec!["public", "schema"]);
    }

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(ModulePath::new("./a//b/").unwrap().as_str(), "a/b");
        assert_eq!(ModulePath::new("a\\b\\c").unwrap().as_str(), "a/b/c");
        assert_eq!(ModulePath::new("a/./b").unwrap().as_str(), "a/b");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(ModulePath::new(""), Err(PathError::Empty));
        assert_eq!(ModulePath::new("./"), Err(PathError::Empty));
        assert_eq!(ModulePath::new("."), Err(PathError::Empty));
    }

    #[test]
    fn rejects_absolute() {
        assert!(matches!(ModulePath::new("/abs"), Err(PathError::Absolute(_))));
        assert!(matches!(ModulePath::new("\\abs"), Err(PathError::Absolute(_))));
        assert!(matches!(ModulePath::new("C:/abs"), Err(PathError::Absolute(_))));
    }

    #[test]
    fn rejects_parent_components() {
        assert!(matches!(
            ModulePath::new("a/../b"),
            Err(PathError::ParentComponent(_))
        ));
    }

    #[test]
    fn join_relocates_under_prefix() {
        let path = ModulePath::new("public/schema").unwrap();
        assert_eq!(path.join("lineage.cue").unwrap(), "public/schema/lineage.cue");
        assert_eq!(path.join("./nested/x.cue").unwrap(), "public/schema/nested/x.cue");
        assert_eq!(path.join(".").unwrap(), "public/schema");
        assert!(path.join("../escape.cue").is_err());
        assert!(path.join("/abs.cue").is_err());
    }

    #[test]
    fn join_keeps_source_names_verbatim() {
        let path = ModulePath::new("public/schema").unwrap();
        assert_eq!(path.join("a\\b.cue").unwrap(), "public/schema/a\\b.cue");
        assert_eq!(path.join("c:lineage.cue").unwrap(), "public/schema/c:lineage.cue");
        assert_eq!(path.join("nested/C:x.cue").unwrap(), "public/schema/nested/C:x.cue");
    }

    #[test]
    fn try_from_string_validates() {
        let path = ModulePath::try_from("kinds/dashboard".to_string()).unwrap();
        assert_eq!(String::from(path), "kinds/dashboard");
        assert!(ModulePath::try_from("../up").is_err());
    }
}
