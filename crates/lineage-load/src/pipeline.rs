//! # Lineage Pipeline
//!
//! Turns a source tree into a bound lineage:
//!
//! ```text
//! Start -> OverlayBuilt -> InstanceResolved -> ValueCompiled -> LineageBound
//!   \___________\________________\_________________\____________> Failed
//! ```
//!
//! Steps run strictly in sequence on the calling thread. The first failing
//! step ends the load; its error reaches the caller as a
//! [`LoadError`](crate::error::LoadError) carrying the step. The overlay is
//! built fresh per load and dropped when the load returns.

use lineage_core::{
    build_overlay_with, ModuleDescriptor, ModulePath, OverlayError, OverlayResult, SourceFs,
    VirtualFs,
};

use crate::bind::LineageLibrary;
use crate::compile::CompilerContext;
use crate::config::LoaderConfig;
use crate::error::{ConfigError, LoadResult};
use crate::instance::{InstanceLoader, ModuleLoader};

/// Overlay construction plus instance resolution, parameterized by loader.
#[derive(Debug, Clone)]
pub struct LineagePipeline<I = ModuleLoader> {
    descriptor: ModuleDescriptor,
    loader: I,
}

impl LineagePipeline<ModuleLoader> {
    /// Pipeline with the default descriptor and module loader.
    pub fn new() -> Self {
        Self::with_loader(ModuleDescriptor::default(), ModuleLoader::default())
    }

    /// Pipeline whose descriptor and loader follow `config`.
    pub fn from_config(config: LoaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_loader(
            config.descriptor(),
            ModuleLoader::new(config),
        ))
    }
}

impl Default for LineagePipeline<ModuleLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: InstanceLoader> LineagePipeline<I> {
    pub fn with_loader(descriptor: ModuleDescriptor, loader: I) -> Self {
        Self { descriptor, loader }
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn loader(&self) -> &I {
        &self.loader
    }

    /// Build the overlay this pipeline would hand to its loader.
    pub fn build_overlay(
        &self,
        target: &ModulePath,
        source: &dyn SourceFs,
    ) -> OverlayResult<VirtualFs> {
        build_overlay_with(&self.descriptor, target, source)
    }

    /// Load the lineage whose sources `source` holds, placing them under
    /// `path` in the overlay.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step. `path` itself is
    /// validated as part of building the overlay.
    pub fn load<L: LineageLibrary>(
        &self,
        path: &str,
        source: &dyn SourceFs,
        library: &L,
        options: &[L::BindOption],
    ) -> LoadResult<L::Lineage> {
        let result = self.run(path, source, library, options);
        if let Err(e) = &result {
            tracing::debug!(path, step = %e.step(), error = %e, "lineage load failed");
        }
        result
    }

    fn run<L: LineageLibrary>(
        &self,
        path: &str,
        source: &dyn SourceFs,
        library: &L,
        options: &[L::BindOption],
    ) -> LoadResult<L::Lineage> {
        let target = ModulePath::new(path).map_err(OverlayError::from)?;

        let overlay = self.build_overlay(&target, source)?;
        tracing::debug!(path = %target, files = overlay.len(), "overlay built");

        let instance = self.loader.load_instance(&overlay, &target)?;
        tracing::debug!(instance = %instance.import_path(), "instance resolved");

        let value = library.context().build_instance(&instance)?;
        tracing::debug!(instance = %instance.import_path(), "value compiled");

        let lineage = library.bind_lineage(value, options)?;
        tracing::debug!(instance = %instance.import_path(), "lineage bound");
        Ok(lineage)
    }
}

/// Load a lineage with the default pipeline.
///
/// `source` must hold exactly one lineage file at its root; it is placed
/// under `path` next to a synthetic module descriptor, resolved, compiled
/// with `library`'s context and bound with `options`.
pub fn load_lineage<L: LineageLibrary>(
    path: &str,
    source: &dyn SourceFs,
    library: &L,
    options: &[L::BindOption],
) -> LoadResult<L::Lineage> {
    LineagePipeline::new().load(path, source, library, options)
}
