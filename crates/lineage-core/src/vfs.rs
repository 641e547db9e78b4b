//! # Virtual Filesystem
//!
//! An immutable, file-keyed, in-memory filesystem. Directories are implicit:
//! a directory exists exactly when some file path has it as a prefix.
//! Keys are slash-delimited module-relative paths and are unique.

use std::collections::BTreeMap;

use crate::digest::{digest_files, ContentDigest};

/// A file held in a [`VirtualFs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    path: String,
    data: Vec<u8>,
}

impl VirtualFile {
    /// Create a file at `path` with `data` as its payload.
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Slash-delimited path of the file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Extension of the final path component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// File payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// An immutable mapping from path to [`VirtualFile`].
///
/// Iteration is in ascending path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFs {
    files: BTreeMap<String, VirtualFile>,
}

impl VirtualFs {
    /// Build a filesystem from a set of files. A later file replaces an
    /// earlier one with the same path.
    pub fn from_files(files: impl IntoIterator<Item = VirtualFile>) -> Self {
        let files = files
            .into_iter()
            .map(|file| (file.path.clone(), file))
            .collect();
        Self { files }
    }

    pub(crate) fn from_map(files: BTreeMap<String, VirtualFile>) -> Self {
        Self { files }
    }

    /// Look up a file by exact path.
    pub fn get(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(path)
    }

    /// Returns true if a file exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// All files, sorted by path.
    pub fn files(&self) -> impl Iterator<Item = &VirtualFile> {
        self.files.values()
    }

    /// Files that are direct children of `dir`, sorted by path.
    ///
    /// `dir` is slash-delimited; an empty `dir` lists the root.
    pub fn read_dir(&self, dir: &str) -> Vec<&VirtualFile> {
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        self.files
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(_, file)| file)
            .collect()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Content digest over every path and payload.
    pub fn digest(&self) -> ContentDigest {
        digest_files(self.files.values())
    }
}
