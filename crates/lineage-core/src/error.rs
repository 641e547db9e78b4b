//! # Error Types
//!
//! Errors raised while normalizing module paths and while building an
//! overlay filesystem. Every variant that concerns a file carries the
//! slash-delimited path that failed so the caller can report it.

use std::io;

use thiserror::Error;

/// A module-relative path was rejected during normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path had no components after normalization.
    #[error("module path is empty")]
    Empty,

    /// The path started at a filesystem root.
    #[error("module path {0:?} must be relative")]
    Absolute(String),

    /// The path tried to climb above the module root.
    #[error("module path {0:?} must not contain '..' components")]
    ParentComponent(String),
}

/// Error while building an overlay filesystem from a source tree.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// The source filesystem could not be traversed.
    #[error("failed to walk source at {path}: {source}")]
    Walk {
        /// Source-relative path of the entry that could not be read.
        path: String,
        source: io::Error,
    },

    /// A source file could not be opened.
    #[error("failed to open source file {path}: {source}")]
    Open { path: String, source: io::Error },

    /// A source file could not be read to the end.
    #[error("failed to read source file {path}: {source}")]
    Read { path: String, source: io::Error },

    /// A relocated source file would replace the synthetic module descriptor.
    #[error("source file relocated to {path} collides with the module descriptor")]
    DescriptorCollision { path: String },

    /// Two source entries were relocated to the same overlay path.
    #[error("overlay path {path} produced more than once")]
    DuplicatePath { path: String },

    /// The target path or a source path is not a valid module path.
    #[error("invalid module path: {0}")]
    InvalidPath(#[from] PathError),
}

/// Failure reported by a [`SourceFs`](crate::SourceFs) walk.
///
/// Converted into [`OverlayError::Walk`] by the overlay builder.
#[derive(Error, Debug)]
#[error("walk failed at {path}: {source}")]
pub struct WalkError {
    /// Source-relative path where the walk failed (`.` for the root).
    pub path: String,
    pub source: io::Error,
}

impl WalkError {
    /// Create a walk error for `path`.
    pub fn new(path: impl Into<String>, source: io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

impl From<WalkError> for OverlayError {
    fn from(err: WalkError) -> Self {
        OverlayError::Walk {
            path: err.path,
            source: err.source,
        }
    }
}

/// Result type alias for overlay operations.
pub type OverlayResult<T> = Result<T, OverlayError>;
