//! # Source Filesystems
//!
//! A [`SourceFs`] is a read-only tree of files supplied by the caller: an
//! embedded asset set ([`MapSource`]) or a directory on disk
//! ([`DirSource`]). The overlay builder only needs to walk the tree and
//! open files for reading.
//!
//! ## Walk Contract
//!
//! - Paths are relative to the source root and slash-delimited. `/` is the
//!   only separator; every other character, `\` and `:` included, is part
//!   of a name.
//! - The walk is depth-first, visiting each directory's entries in
//!   lexicographic name order, so a given tree always walks the same way.
//! - Directories are reported as well as files; the root itself is not.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::WalkError;
use crate::path::normalize_source;

/// Kind of entry reported by a source walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory. Never materialized in an overlay.
    Dir,
    /// Anything that can be opened and read.
    File,
}

/// One entry of a source walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Slash-delimited path relative to the source root.
    pub path: String,
    pub kind: EntryKind,
}

impl SourceEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
        }
    }

    /// Returns true for directory entries.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Iterator returned by [`SourceFs::walk`].
pub type Walk<'a> = Box<dyn Iterator<Item = Result<SourceEntry, WalkError>> + 'a>;

/// A read-only file tree that can be walked and read.
pub trait SourceFs {
    /// Walk every entry below the root in deterministic order.
    fn walk(&self) -> Walk<'_>;

    /// Open the file at `path` (as reported by [`SourceFs::walk`]).
    ///
    /// The returned reader is closed when dropped.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Sort key giving depth-first order with per-directory lexicographic names.
fn walk_order(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// An in-memory source tree, typically built from embedded assets.
///
/// Intermediate directories are synthesized during the walk.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MapSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous file at the same path.
    ///
    /// Empty and `.` components are dropped; a path that is empty, starts
    /// with `/`, or climbs with `..` is rejected.
    pub fn insert(
        &mut self,
        path: impl AsRef<str>,
        data: impl Into<Vec<u8>>,
    ) -> Result<(), crate::PathError> {
        let normalized = normalize_source(path.as_ref())?;
        if normalized.is_empty() {
            return Err(crate::PathError::Empty);
        }
        self.files.insert(normalized, data.into());
        Ok(())
    }

    /// Builder-style [`MapSource::insert`].
    pub fn with_file(
        mut self,
        path: impl AsRef<str>,
        data: impl Into<Vec<u8>>,
    ) -> Result<Self, crate::PathError> {
        self.insert(path, data)?;
        Ok(self)
    }

    /// Build a source from static `(path, contents)` pairs, e.g. the output
    /// of `include_bytes!`.
    pub fn from_static(
        entries: &[(&'static str, &'static [u8])],
    ) -> Result<Self, crate::PathError> {
        let mut source = Self::new();
        for (path, data) in entries {
            source.insert(path, *data)?;
        }
        Ok(source)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if the source holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceFs for MapSource {
    fn walk(&self) -> Walk<'_> {
        let mut dirs: BTreeSet<&str> = BTreeSet::new();
        for path in self.files.keys() {
            let mut end = 0;
            while let Some(idx) = path[end..].find('/') {
                end += idx;
                dirs.insert(&path[..end]);
                end += 1;
            }
        }

        let mut entries: Vec<SourceEntry> = dirs
            .into_iter()
            .map(SourceEntry::dir)
            .chain(self.files.keys().map(|p| SourceEntry::file(p.as_str())))
            .collect();
        entries.sort_by(|a, b| walk_order(&a.path).cmp(&walk_order(&b.path)));

        Box::new(entries.into_iter().map(Ok))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.files.get(path) {
            Some(data) => Ok(Box::new(Cursor::new(data.as_slice()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no file at {path}"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// On-disk source
// ---------------------------------------------------------------------------

/// A directory on the host filesystem.
///
/// Symbolic links are not followed during the walk; a link is reported as
/// a file and opening it reads its target.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Use `root` as the source root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a host path below the root into a slash-delimited path.
    fn relative(&self, path: &Path) -> Result<String, WalkError> {
        let rel = path.strip_prefix(&self.root).map_err(|_| {
            WalkError::new(
                path.display().to_string(),
                io::Error::new(io::ErrorKind::InvalidInput, "entry outside source root"),
            )
        })?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(name) => match name.to_str() {
                    Some(name) => parts.push(name),
                    None => {
                        return Err(WalkError::new(
                            rel.display().to_string(),
                            io::Error::new(io::ErrorKind::InvalidData, "path is not valid UTF-8"),
                        ))
                    }
                },
                Component::CurDir => {}
                _ => {
                    return Err(WalkError::new(
                        rel.display().to_string(),
                        io::Error::new(io::ErrorKind::InvalidInput, "unexpected path component"),
                    ))
                }
            }
        }
        Ok(parts.join("/"))
    }
}

impl SourceFs for DirSource {
    fn walk(&self) -> Walk<'_> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        Box::new(walker.into_iter().map(move |entry| {
            let entry = entry.map_err(|err| {
                // The root itself relativizes to "".
                let path = err
                    .path()
                    .and_then(|p| self.relative(p).ok())
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| ".".to_string());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop"));
                WalkError::new(path, source)
            })?;

            let path = self.relative(entry.path())?;
            Ok(if entry.file_type().is_dir() {
                SourceEntry::dir(path)
            } else {
                SourceEntry::file(path)
            })
        }))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let relative = normalize_source(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if relative.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty source path",
            ));
        }

        let mut host = self.root.clone();
        for part in relative.split('/') {
            host.push(part);
        }
        Ok(Box::new(File::open(host)?))
    }
}
