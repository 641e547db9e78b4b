//! Shared compiler context and lineage library.
//!
//! A [`Runtime`] is built once at startup and cloned into every caller.
//! Clones share the same context and library; nothing is global.

use std::sync::Arc;

use lineage_core::SourceFs;

use crate::bind::{BindOption, Library};
use crate::compile::DocumentContext;
use crate::error::{BindError, LoadResult};
use crate::lineage::Lineage;
use crate::pipeline::load_lineage;

/// The compiler context and lineage library pair used for every load.
#[derive(Debug, Clone)]
pub struct Runtime {
    context: Arc<DocumentContext>,
    library: Arc<Library>,
}

impl Runtime {
    /// Build a fresh context and a library bound to it.
    pub fn new() -> Result<Self, BindError> {
        let context = Arc::new(DocumentContext::new());
        let library = Arc::new(Library::new(Arc::clone(&context))?);
        Ok(Self { context, library })
    }

    /// The shared compiler context.
    pub fn context(&self) -> &Arc<DocumentContext> {
        &self.context
    }

    /// The shared lineage library.
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// [`load_lineage`] against this runtime's library.
    pub fn load_lineage(
        &self,
        path: &str,
        source: &dyn SourceFs,
        options: &[BindOption],
    ) -> LoadResult<Lineage> {
        load_lineage(path, source, self.library.as_ref(), options)
    }
}
