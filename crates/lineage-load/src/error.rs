//! # Error Types - Pipeline Failure Taxonomy
//!
//! Each pipeline step has its own error type. [`LoadError`] wraps them
//! without changing their kind so callers can match on the step that
//! failed and on its detail.
//!
//! | Step             | Error                                   |
//! |------------------|-----------------------------------------|
//! | build overlay    | [`OverlayError`](lineage_core::OverlayError) |
//! | resolve instance | [`InstanceError`]                       |
//! | compile          | [`CompileError`]                        |
//! | bind             | [`BindError`]                           |
//!
//! None of these are transient; nothing is retried.

use std::fmt;

use lineage_core::OverlayError;
use thiserror::Error;

use crate::lineage::SchemaVersion;

/// The overlay did not satisfy the loader's structural contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// No module descriptor at the module root.
    #[error("module descriptor not found at {path}")]
    MissingDescriptor { path: String },

    /// The descriptor does not declare a module identity.
    #[error("module descriptor at {path} is malformed: {reason}")]
    MalformedDescriptor { path: String, reason: String },

    /// The target directory holds no schema source.
    #[error("no schema source files in {dir}")]
    NoSourceFiles { dir: String },

    /// The target directory holds more than one schema source.
    #[error("ambiguous lineage root in {dir}: expected one schema file, found {}", .files.join(", "))]
    AmbiguousRoot { dir: String, files: Vec<String> },
}

/// The resolved instance could not be compiled into a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A source file is not UTF-8 text.
    #[error("{path}: source is not valid UTF-8")]
    NotUtf8 { path: String },

    /// A source file failed to parse.
    #[error("{path}:{line}:{column}: {message}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A source file's top level is not a struct.
    #[error("{path}: top level must be a struct, found {found}")]
    NotStruct { path: String, found: String },

    /// A source value has no compiled representation.
    #[error("{path}: {reason}")]
    Unsupported { path: String, reason: String },

    /// Two files declare the same field with different values.
    #[error("field {field:?} conflicts between {first} and {second}")]
    Conflict {
        field: String,
        first: String,
        second: String,
    },
}

/// A lineage structure rule broken by the compiled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending value, e.g. `/schemas/1/version`.
    pub instance_path: String,
    /// JSON Pointer to the rule in the lineage structure schema.
    pub schema_path: String,
    pub message: String,
}

impl Violation {
    /// Index of the schema entry the violation sits in, if any.
    pub fn schema_index(&self) -> Option<usize> {
        let mut tokens = self.instance_path.split('/').skip(1);
        match (tokens.next(), tokens.next()) {
            (Some("schemas"), Some(index)) => index.parse().ok(),
            _ => None,
        }
    }

    /// Field location in lineage terms: `lineage`, `name`,
    /// `schemas[1].version`.
    pub fn location(&self) -> String {
        let mut location = String::new();
        for token in self.instance_path.split('/').skip(1) {
            let token = token.replace("~1", "/").replace("~0", "~");
            if token.parse::<usize>().is_ok() {
                location.push_str(&format!("[{token}]"));
            } else {
                if !location.is_empty() {
                    location.push('.');
                }
                location.push_str(&token);
            }
        }
        if location.is_empty() {
            location.push_str("lineage");
        }
        location
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Every structure violation found in one compiled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    items: Vec<Violation>,
}

impl Violations {
    pub(crate) fn new(items: Vec<Violation>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.items
    }

    /// Violations inside schema entry `index`.
    pub fn in_schema(&self, index: usize) -> impl Iterator<Item = &Violation> {
        self.items
            .iter()
            .filter(move |v| v.schema_index() == Some(index))
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in &self.items {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "- {v}")?;
        }
        Ok(())
    }
}

/// The compiled value does not follow lineage conventions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The value does not have the lineage structure.
    #[error("lineage structure invalid:\n{violations}")]
    Structure { violations: Violations },

    /// The value could not be decoded as a lineage.
    #[error("lineage malformed: {0}")]
    Malformed(String),

    /// The first schema is not version 0.0.
    #[error("lineage must start at version 0.0, found {found}")]
    MissingInitialVersion { found: SchemaVersion },

    /// A version does not directly follow its predecessor.
    #[error("lineage version {found} does not follow {previous}; expected {} or {}", .previous.next_minor(), .previous.next_major())]
    VersionGap {
        previous: SchemaVersion,
        found: SchemaVersion,
    },

    /// The lineage name differs from the one the caller required.
    #[error("lineage name {found:?} does not match required name {expected:?}")]
    NameMismatch { expected: String, found: String },

    /// The embedded lineage structure schema failed to compile.
    #[error("lineage structure schema invalid: {0}")]
    InvalidStructureSchema(String),
}

/// Malformed loader configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration document failed to parse.
    #[error("failed to parse loader config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field holds an unusable value.
    #[error("invalid loader config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Pipeline step at which a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStep {
    BuildOverlay,
    ResolveInstance,
    Compile,
    Bind,
}

impl fmt::Display for LoadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStep::BuildOverlay => "build-overlay",
            LoadStep::ResolveInstance => "resolve-instance",
            LoadStep::Compile => "compile",
            LoadStep::Bind => "bind",
        };
        f.write_str(name)
    }
}

/// Failure of a lineage load. Terminal: no partial lineage exists.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

impl LoadError {
    /// The step that produced this error.
    pub fn step(&self) -> LoadStep {
        match self {
            LoadError::Overlay(_) => LoadStep::BuildOverlay,
            LoadError::Instance(_) => LoadStep::ResolveInstance,
            LoadError::Compile(_) => LoadStep::Compile,
            LoadError::Bind(_) => LoadStep::Bind,
        }
    }
}

/// Result type alias for lineage loads.
pub type LoadResult<T> = Result<T, LoadError>;
