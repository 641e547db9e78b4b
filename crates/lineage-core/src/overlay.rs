//! # Overlay Construction
//!
//! A lineage loader resolves schema files as part of a module: every file
//! must live under a module-relative directory and a module descriptor must
//! sit at the module root. Source trees handed to us are rarely shaped like
//! that, so we synthesize one:
//!
//! ```text
//! source                    overlay (target = "public/schema")
//! ──────                    ──────────────────────────────────
//!                           cue.mod/module.cue      (synthetic)
//! lineage.cue         ─►    public/schema/lineage.cue
//! ```
//!
//! ## Invariants
//!
//! - The overlay holds exactly one descriptor, at [`MODULE_DESCRIPTOR_PATH`],
//!   with the descriptor's constant payload.
//! - Every source file appears exactly once at `target/<source path>`.
//! - A source file that would land on the descriptor path is rejected with
//!   [`OverlayError::DescriptorCollision`]; the descriptor is never replaced.
//! - On error no overlay is returned.

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::{OverlayError, OverlayResult};
use crate::path::ModulePath;
use crate::source::SourceFs;
use crate::vfs::{VirtualFile, VirtualFs};

/// Fixed location of the module descriptor inside an overlay.
pub const MODULE_DESCRIPTOR_PATH: &str = "cue.mod/module.cue";

/// Module identity declared by the default descriptor.
pub const DEFAULT_MODULE_IDENTITY: &str = "github.com/grafana/grafana";

/// The synthetic module descriptor placed at the overlay root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    identity: String,
}

impl ModuleDescriptor {
    /// Descriptor declaring `identity` as the module path.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    /// The declared module identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Descriptor file contents.
    pub fn contents(&self) -> Vec<u8> {
        format!("module: \"{}\"", self.identity).into_bytes()
    }

    /// The descriptor as an overlay file.
    pub fn to_file(&self) -> VirtualFile {
        VirtualFile::new(MODULE_DESCRIPTOR_PATH, self.contents())
    }
}

impl Default for ModuleDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_IDENTITY)
    }
}

/// Accumulates relocated files on top of a module descriptor.
///
/// The descriptor is inserted at construction, before any source file.
#[derive(Debug)]
pub struct OverlayBuilder {
    target: ModulePath,
    files: BTreeMap<String, VirtualFile>,
}

impl OverlayBuilder {
    /// Start an overlay that relocates files under `target`.
    pub fn new(target: ModulePath, descriptor: &ModuleDescriptor) -> Self {
        let mut files = BTreeMap::new();
        files.insert(MODULE_DESCRIPTOR_PATH.to_string(), descriptor.to_file());
        Self { target, files }
    }

    /// The directory files are relocated under.
    pub fn target(&self) -> &ModulePath {
        &self.target
    }

    /// Relocate a source file to `target/source_path`.
    ///
    /// # Errors
    ///
    /// - [`OverlayError::InvalidPath`] if `source_path` is absolute, climbs
    ///   with `..`, or is empty.
    /// - [`OverlayError::DescriptorCollision`] if the relocated path is the
    ///   descriptor path.
    /// - [`OverlayError::DuplicatePath`] if the relocated path was already
    ///   inserted.
    pub fn insert(&mut self, source_path: &str, data: Vec<u8>) -> OverlayResult<()> {
        let dest = self.target.join(source_path)?;
        if dest == self.target.as_str() {
            return Err(crate::PathError::Empty.into());
        }
        if dest == MODULE_DESCRIPTOR_PATH {
            return Err(OverlayError::DescriptorCollision { path: dest });
        }
        if self.files.contains_key(&dest) {
            return Err(OverlayError::DuplicatePath { path: dest });
        }

        tracing::trace!(
            source = source_path,
            dest = %dest,
            bytes = data.len(),
            "relocated source file"
        );
        self.files.insert(dest.clone(), VirtualFile::new(dest, data));
        Ok(())
    }

    /// Walk `source` and relocate every file it contains.
    ///
    /// Stops at the first walk, open, or read failure.
    pub fn ingest(&mut self, source: &dyn SourceFs) -> OverlayResult<()> {
        for entry in source.walk() {
            let entry = entry?;
            if entry.is_dir() {
                continue;
            }
            let data = read_source_file(source, &entry.path)?;
            self.insert(&entry.path, data)?;
        }
        Ok(())
    }

    /// Finish the overlay.
    pub fn build(self) -> VirtualFs {
        VirtualFs::from_map(self.files)
    }
}

/// Read a whole source file. The handle is dropped before returning on
/// every path.
fn read_source_file(source: &dyn SourceFs, path: &str) -> OverlayResult<Vec<u8>> {
    let mut reader = source.open(path).map_err(|e| OverlayError::Open {
        path: path.to_string(),
        source: e,
    })?;
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|e| OverlayError::Read {
            path: path.to_string(),
            source: e,
        })?;
    Ok(data)
}

/// Build an overlay with the default descriptor.
///
/// See [`build_overlay_with`].
pub fn build_overlay(target: &ModulePath, source: &dyn SourceFs) -> OverlayResult<VirtualFs> {
    build_overlay_with(&ModuleDescriptor::default(), target, source)
}

/// Build an overlay holding `descriptor` plus every file of `source`
/// relocated under `target`.
///
/// # Errors
///
/// Returns the first [`OverlayError`] raised while walking, opening,
/// reading, or relocating a source file. No partial overlay is returned.
pub fn build_overlay_with(
    descriptor: &ModuleDescriptor,
    target: &ModulePath,
    source: &dyn SourceFs,
) -> OverlayResult<VirtualFs> {
    let mut builder = OverlayBuilder::new(target.clone(), descriptor);
    builder.ingest(source)?;
    let overlay = builder.build();

    tracing::debug!(
        prefix = %target,
        files = overlay.len(),
        digest = %overlay.digest(),
        "built overlay filesystem"
    );
    Ok(overlay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;

    fn target() -> ModulePath {
        ModulePath::new("public/schema").unwrap()
    }

    #[test]
    fn descriptor_contents_are_fixed() {
        let descriptor = ModuleDescriptor::default();
        assert_eq!(
            descriptor.contents(),
            b"module: \"github.com/grafana/grafana\"".to_vec()
        );
        assert_eq!(descriptor.to_file().path(), MODULE_DESCRIPTOR_PATH);
    }

    #[test]
    fn builder_starts_with_descriptor() {
        let overlay = OverlayBuilder::new(target(), &ModuleDescriptor::default()).build();
        assert_eq!(overlay.paths().collect::<Vec<_>>(), vec![MODULE_DESCRIPTOR_PATH]);
    }

    #[test]
    fn insert_relocates_under_target() {
        let mut builder = OverlayBuilder::new(target(), &ModuleDescriptor::default());
        builder.insert("lineage.cue", b"x".to_vec()).unwrap();
        let overlay = builder.build();
        assert_eq!(
            overlay.get("public/schema/lineage.cue").map(|f| f.data()),
            Some(b"x".as_slice())
        );
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut builder = OverlayBuilder::new(target(), &ModuleDescriptor::default());
        builder.insert("a.cue", Vec::new()).unwrap();
        let err = builder.insert("./a.cue", Vec::new()).unwrap_err();
        assert!(matches!(err, OverlayError::DuplicatePath { .. }));
    }

    #[test]
    fn insert_rejects_empty_source_path() {
        let mut builder = OverlayBuilder::new(target(), &ModuleDescriptor::default());
        let err = builder.insert(".", Vec::new()).unwrap_err();
        assert!(matches!(err, OverlayError::InvalidPath(_)));
    }

    #[test]
    fn collision_with_descriptor_is_rejected() {
        let source = MapSource::new().with_file("module.cue", "module: \"evil\"").unwrap();
        let err = build_overlay(&ModulePath::new("cue.mod").unwrap(), &source).unwrap_err();
        match err {
            OverlayError::DescriptorCollision { path } => {
                assert_eq!(path, MODULE_DESCRIPTOR_PATH)
            }
            other => panic!("Expected DescriptorCollision, got: {other}"),
        }
    }

    #[test]
    fn custom_identity_is_written() {
        let descriptor = ModuleDescriptor::new("example.com/schemas");
        let overlay =
            build_overlay_with(&descriptor, &target(), &MapSource::new()).unwrap();
        let file = overlay.get(MODULE_DESCRIPTOR_PATH).unwrap();
        assert_eq!(file.data(), b"module: \"example.com/schemas\"");
    }
}
