//! # lineage-load - Loading Schema Lineages
//!
//! Drives a source tree through the lineage pipeline: build the overlay
//! filesystem, resolve the schema instance, compile it, bind it.
//!
//! - [`load_lineage`] / [`LineagePipeline`]: the entry operation.
//! - [`InstanceLoader`], [`CompilerContext`], [`LineageLibrary`]: the
//!   collaborator seams, with reference implementations [`ModuleLoader`],
//!   [`DocumentContext`] and [`Library`].
//! - [`Runtime`]: the context and library pair shared by every load.
//! - [`LoadError`]: which step failed, and why.
//!
//! ## Crate Policy
//!
//! - Depends only on `lineage-core` among `lineage-*` crates.
//! - No global state. Shared state lives in a [`Runtime`] the caller owns.
//! - Emits `tracing` events; never installs a subscriber.
//! - No `.unwrap()` outside tests.

pub mod bind;
pub mod compile;
pub mod config;
pub mod error;
pub mod instance;
pub mod lineage;
pub mod pipeline;
pub mod runtime;

pub use bind::{BindOption, LineageLibrary, Library};
pub use compile::{CompilerContext, DocumentContext};
pub use config::LoaderConfig;
pub use error::{
    BindError, CompileError, ConfigError, InstanceError, LoadError, LoadResult, LoadStep,
    Violation, Violations,
};
pub use instance::{Instance, InstanceLoader, ModuleLoader};
pub use lineage::{Lineage, Schema, SchemaVersion};
pub use pipeline::{load_lineage, LineagePipeline};
pub use runtime::Runtime;
