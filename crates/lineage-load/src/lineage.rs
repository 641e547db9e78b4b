//! # Lineages
//!
//! A [`Lineage`] is a named, ordered sequence of schemas. Each schema has a
//! [`SchemaVersion`] `major.minor`; the sequence starts at `0.0` and every
//! later version either bumps the minor (backwards-compatible change) or
//! bumps the major and resets the minor (breaking change).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `major.minor` schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
}

impl SchemaVersion {
    /// The first version of every lineage.
    pub const INITIAL: SchemaVersion = SchemaVersion { major: 0, minor: 0 };

    pub fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// The next backwards-compatible version.
    pub fn next_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1)
    }

    /// The next breaking version.
    pub fn next_major(&self) -> Self {
        Self::new(self.major + 1, 0)
    }

    /// Returns true if `next` may directly follow this version.
    pub fn is_followed_by(&self, next: SchemaVersion) -> bool {
        next == self.next_minor() || next == self.next_major()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl From<[u64; 2]> for SchemaVersion {
    fn from([major, minor]: [u64; 2]) -> Self {
        Self::new(major, minor)
    }
}

impl From<SchemaVersion> for [u64; 2] {
    fn from(v: SchemaVersion) -> Self {
        [v.major, v.minor]
    }
}

/// One schema of a lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: SchemaVersion,
    /// The schema body as compiled.
    pub schema: Value,
}

/// A bound lineage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineage {
    name: String,
    schemas: Vec<Schema>,
}

impl Lineage {
    /// Only the binder constructs lineages, after checking the version
    /// sequence and that `schemas` is non-empty.
    pub(crate) fn new(name: String, schemas: Vec<Schema>) -> Self {
        Self { name, schemas }
    }

    /// Lineage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All schemas in version order.
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// All versions in order.
    pub fn versions(&self) -> Vec<SchemaVersion> {
        self.schemas.iter().map(|s| s.version).collect()
    }

    /// The schema at version `0.0`.
    pub fn first(&self) -> &Schema {
        &self.schemas[0]
    }

    /// The most recent schema.
    pub fn latest(&self) -> &Schema {
        &self.schemas[self.schemas.len() - 1]
    }

    /// Look up the schema at `version`.
    pub fn schema(&self, version: SchemaVersion) -> Option<&Schema> {
        self.schemas
            .binary_search_by(|s| s.version.cmp(&version))
            .ok()
            .map(|idx| &self.schemas[idx])
    }
}
