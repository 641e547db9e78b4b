//! # Binding
//!
//! Binding validates a compiled value against lineage conventions and
//! wraps it in a [`Lineage`]. A [`LineageLibrary`] owns the compiler
//! context used to produce those values, so one library instance stands
//! for one consistent compile-and-bind environment.
//!
//! ## Lineage Conventions
//!
//! ```yaml
//! name: dashboard
//! schemas:
//!   - version: [0, 0]
//!     schema: { title: string }
//!   - version: [0, 1]
//!     schema: { title: string, uid: string }
//! ```
//!
//! 1. Structure: `name` is an identifier, `schemas` is a non-empty list of
//!    `{ version: [major, minor], schema: struct }`. Checked against an
//!    embedded JSON Schema (Draft 2020-12).
//! 2. Sequence: the first version is `0.0`; each following version is the
//!    next minor or the next major of its predecessor.

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;

use crate::compile::{CompilerContext, DocumentContext};
use crate::error::{BindError, Violation, Violations};
use crate::lineage::{Lineage, Schema, SchemaVersion};

/// JSON Schema describing the lineage structure.
const LINEAGE_STRUCTURE_SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "type": "object",
  "required": ["name", "schemas"],
  "properties": {
    "name": {
      "type": "string",
      "pattern": "^[A-Za-z][A-Za-z0-9_-]*$"
    },
    "schemas": {
      "type": "array",
      "minItems": 1,
      "items": {
        "type": "object",
        "required": ["version", "schema"],
        "additionalProperties": false,
        "properties": {
          "version": {
            "type": "array",
            "prefixItems": [
              { "type": "integer", "minimum": 0 },
              { "type": "integer", "minimum": 0 }
            ],
            "minItems": 2,
            "maxItems": 2
          },
          "schema": { "type": "object" }
        }
      }
    }
  }
}"#;

/// Compiles and binds lineages.
pub trait LineageLibrary: Send + Sync {
    /// Compiler context values are built with.
    type Context: CompilerContext;
    /// The bound lineage.
    type Lineage;
    /// Caller-supplied binding policy.
    type BindOption;

    /// The compiler context owned by this library.
    fn context(&self) -> &Self::Context;

    /// Validate `value` and bind it into a lineage.
    fn bind_lineage(
        &self,
        value: Value,
        options: &[Self::BindOption],
    ) -> Result<Self::Lineage, BindError>;
}

/// Binding policy for [`Library`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOption {
    /// Skip the JSON Schema structure pass. Decoding and the version
    /// sequence are still checked.
    SkipStructureCheck,
    /// Fail unless the lineage has this name.
    RequireName(String),
}

#[derive(Deserialize)]
struct RawLineage {
    name: String,
    schemas: Vec<Schema>,
}

/// Lineage library backed by a shared compiler context.
pub struct Library<C = DocumentContext> {
    context: Arc<C>,
    structure: Validator,
}

impl<C: CompilerContext> Library<C> {
    /// Create a library over `context`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InvalidStructureSchema`] if the embedded
    /// lineage structure schema fails to compile.
    pub fn new(context: Arc<C>) -> Result<Self, BindError> {
        let schema: Value = serde_json::from_str(LINEAGE_STRUCTURE_SCHEMA)
            .map_err(|e| BindError::InvalidStructureSchema(e.to_string()))?;

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let structure = opts
            .build(&schema)
            .map_err(|e| BindError::InvalidStructureSchema(e.to_string()))?;

        Ok(Self { context, structure })
    }

    /// Shared handle to the compiler context.
    pub fn context_handle(&self) -> Arc<C> {
        Arc::clone(&self.context)
    }

    fn check_structure(&self, value: &Value) -> Result<(), BindError> {
        let violations: Vec<Violation> = self
            .structure
            .iter_errors(value)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(BindError::Structure {
                violations: Violations::new(violations),
            })
        }
    }
}

impl<C: CompilerContext> LineageLibrary for Library<C> {
    type Context = C;
    type Lineage = Lineage;
    type BindOption = BindOption;

    fn context(&self) -> &C {
        &self.context
    }

    fn bind_lineage(&self, value: Value, options: &[BindOption]) -> Result<Lineage, BindError> {
        if !options.contains(&BindOption::SkipStructureCheck) {
            self.check_structure(&value)?;
        }

        let raw: RawLineage =
            serde_json::from_value(value).map_err(|e| BindError::Malformed(e.to_string()))?;

        for option in options {
            if let BindOption::RequireName(expected) = option {
                if *expected != raw.name {
                    return Err(BindError::NameMismatch {
                        expected: expected.clone(),
                        found: raw.name,
                    });
                }
            }
        }

        check_sequence(&raw.schemas)?;
        Ok(Lineage::new(raw.name, raw.schemas))
    }
}

/// Check that versions start at 0.0 and advance one step at a time.
fn check_sequence(schemas: &[Schema]) -> Result<(), BindError> {
    let first = schemas
        .first()
        .ok_or_else(|| BindError::Malformed("lineage has no schemas".to_string()))?;
    if first.version != SchemaVersion::INITIAL {
        return Err(BindError::MissingInitialVersion {
            found: first.version,
        });
    }

    for pair in schemas.windows(2) {
        let (previous, found) = (pair[0].version, pair[1].version);
        if !previous.is_followed_by(found) {
            return Err(BindError::VersionGap { previous, found });
        }
    }
    Ok(())
}

impl<C> fmt::Debug for Library<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library").finish_non_exhaustive()
    }
}
