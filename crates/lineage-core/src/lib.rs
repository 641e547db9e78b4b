//! # lineage-core - Overlay Filesystems for Schema Lineages
//!
//! A schema lineage is loaded by a module-aware loader: it expects every
//! schema file to live under a module-relative directory and a module
//! descriptor to exist at the module root. This crate builds that layout
//! from an arbitrary source tree.
//!
//! - [`ModulePath`]: validated, slash-delimited module-relative path.
//! - [`SourceFs`]: read-only source trees, in memory ([`MapSource`]) or on
//!   disk ([`DirSource`]).
//! - [`VirtualFs`]: the immutable overlay handed to the loader.
//! - [`build_overlay`]: descriptor + every source file relocated under a
//!   target path.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lineage-*` crates.
//! - No global state; every overlay is built fresh and owned by its caller.
//! - No `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod overlay;
pub mod path;
pub mod source;
pub mod vfs;

pub use digest::{digest_files, ContentDigest, DigestAlgorithm};
pub use error::{OverlayError, OverlayResult, PathError, WalkError};
pub use overlay::{
    build_overlay, build_overlay_with, ModuleDescriptor, OverlayBuilder,
    DEFAULT_MODULE_IDENTITY, MODULE_DESCRIPTOR_PATH,
};
pub use path::ModulePath;
pub use source::{DirSource, EntryKind, MapSource, SourceEntry, SourceFs, Walk};
pub use vfs::{VirtualFile, VirtualFs};
