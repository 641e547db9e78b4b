//! # Compilation
//!
//! A [`CompilerContext`] turns a resolved [`Instance`] into a value. The
//! context is built once and shared by every load in the process, so
//! implementations must be `Send + Sync` and keep any internal state safe
//! under concurrent calls.
//!
//! [`DocumentContext`] compiles the data subset of schema sources: struct
//! literals whose fields hold strings, numbers, booleans, null, lists and
//! nested structs, written in YAML/JSON-compatible syntax. Every file of an
//! instance must be a struct (or empty); their top-level fields are unified
//! into one struct. A field declared by two files must hold equal values.
//!
//! Compiled values are interned by import path and content digest for the
//! lifetime of the context. Nothing is evicted: a context is expected to
//! serve a fixed set of embedded lineages, so the cache grows with the
//! number of distinct sources loaded, not with the number of loads.
//! Processes that compile an open-ended stream of sources should call
//! [`DocumentContext::clear_cache`] or use a fresh context. The cache is the
//! context's only state and sits behind a read-mostly lock.

use std::collections::HashMap;

use lineage_core::{digest_files, VirtualFile};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::CompileError;
use crate::instance::Instance;

/// Compiles resolved instances into values.
pub trait CompilerContext: Send + Sync {
    /// Compile `instance` into a single value.
    fn build_instance(&self, instance: &Instance) -> Result<Value, CompileError>;
}

/// Compiler for data-only schema sources.
#[derive(Debug, Default)]
pub struct DocumentContext {
    cache: RwLock<HashMap<String, Value>>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct instances compiled so far.
    pub fn cached_values(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop every interned value.
    pub fn clear_cache(&self) {
        let mut cache = self.cache.write();
        tracing::debug!(dropped = cache.len(), "cleared compiled value cache");
        cache.clear();
    }

    fn cache_key(instance: &Instance) -> String {
        format!(
            "{}@{}",
            instance.import_path(),
            digest_files(instance.files()).to_hex()
        )
    }
}

impl CompilerContext for DocumentContext {
    fn build_instance(&self, instance: &Instance) -> Result<Value, CompileError> {
        let key = Self::cache_key(instance);
        if let Some(value) = self.cache.read().get(&key) {
            tracing::trace!(instance = %instance.import_path(), "compiled value cache hit");
            return Ok(value.clone());
        }

        let value = compile_files(instance.files())?;
        self.cache.write().entry(key).or_insert_with(|| value.clone());
        Ok(value)
    }
}

/// Parse every file and unify the top-level fields.
fn compile_files(files: &[VirtualFile]) -> Result<Value, CompileError> {
    let mut merged = Map::new();
    let mut origin: HashMap<String, String> = HashMap::new();

    for file in files {
        for (field, value) in parse_struct(file)? {
            match merged.get(&field) {
                Some(existing) if *existing != value => {
                    return Err(CompileError::Conflict {
                        first: origin.get(&field).cloned().unwrap_or_default(),
                        second: file.path().to_string(),
                        field,
                    });
                }
                Some(_) => {}
                None => {
                    origin.insert(field.clone(), file.path().to_string());
                    merged.insert(field, value);
                }
            }
        }
    }
    Ok(Value::Object(merged))
}

/// Parse one file into its top-level struct fields.
fn parse_struct(file: &VirtualFile) -> Result<Map<String, Value>, CompileError> {
    let path = file.path();
    let text = std::str::from_utf8(file.data()).map_err(|_| CompileError::NotUtf8 {
        path: path.to_string(),
    })?;

    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        let (line, column) = e
            .location()
            .map(|loc| (loc.line(), loc.column()))
            .unwrap_or((0, 0));
        CompileError::Syntax {
            path: path.to_string(),
            line,
            column,
            message: e.to_string(),
        }
    })?;

    match yaml_to_json_value(yaml, path)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(CompileError::NotStruct {
            path: path.to_string(),
            found: kind_name(&other).to_string(),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "struct",
    }
}

/// Convert a parsed YAML value into a JSON value.
///
/// Struct keys must be strings; tags are stripped; non-finite floats are
/// rejected.
fn yaml_to_json_value(yaml: serde_yaml::Value, path: &str) -> Result<Value, CompileError> {
    let unsupported = |reason: String| CompileError::Unsupported {
        path: path.to_string(),
        reason,
    };

    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| unsupported(format!("cannot represent number {f}")))
            } else {
                Err(unsupported(format!("unsupported number: {n:?}")))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s)),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, CompileError> = seq
                .into_iter()
                .map(|item| yaml_to_json_value(item, path))
                .collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s,
                    other => {
                        return Err(unsupported(format!(
                            "struct field names must be strings, found {other:?}"
                        )))
                    }
                };
                obj.insert(key, yaml_to_json_value(v, path)?);
            }
            Ok(Value::Object(obj))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(tagged.value, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::ModulePath;
    use serde_json::json;

    fn instance(files: &[(&str, &str)]) -> Instance {
        Instance::new(
            "example.com/m",
            ModulePath::new("schema").unwrap(),
            files
                .iter()
                .map(|(p, d)| VirtualFile::new(*p, d.as_bytes().to_vec()))
                .collect(),
        )
    }

    #[test]
    fn compiles_struct_literal() {
        let ctx = DocumentContext::new();
        let value = ctx
            .build_instance(&instance(&[(
                "schema/lineage.cue",
                "name: \"dashboard\"\nschemas:\n  - version: [0, 0]\n    schema: {title: string}\n",
            )]))
            .unwrap();
        assert_eq!(value["name"], "dashboard");
        assert_eq!(value["schemas"][0]["version"], json!([0, 0]));
        assert_eq!(value["schemas"][0]["schema"]["title"], "string");
    }

    #[test]
    fn accepts_json_syntax() {
        let value = DocumentContext::new()
            .build_instance(&instance(&[("schema/l.cue", r#"{"name": "x", "n": 1.5}"#)]))
            .unwrap();
        assert_eq!(value, json!({"name": "x", "n": 1.5}));
    }

    #[test]
    fn empty_file_is_empty_struct() {
        let value = DocumentContext::new()
            .build_instance(&instance(&[("schema/l.cue", "")]))
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn syntax_error_names_file() {
        let err = DocumentContext::new()
            .build_instance(&instance(&[("schema/l.cue", "name: [unclosed\n")]))
            .unwrap_err();
        match err {
            CompileError::Syntax { path, message, .. } => {
                assert_eq!(path, "schema/l.cue");
                assert!(!message.is_empty());
            }
            other => panic!("Expected Syntax, got: {other}"),
        }
    }

    #[test]
    fn top_level_must_be_struct() {
        let err = DocumentContext::new()
            .build_instance(&instance(&[("schema/l.cue", "- a\n- b\n")]))
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::NotStruct {
                path: "schema/l.cue".to_string(),
                found: "list".to_string()
            }
        );
    }

    #[test]
    fn rejects_non_utf8() {
        let inst = Instance::new(
            "m",
            ModulePath::new("schema").unwrap(),
            vec![VirtualFile::new("schema/l.cue", vec![0xff, 0xfe, 0x00])],
        );
        let err = DocumentContext::new().build_instance(&inst).unwrap_err();
        assert!(matches!(err, CompileError::NotUtf8 { .. }));
    }

    #[test]
    fn rejects_non_string_keys() {
        let err = DocumentContext::new()
            .build_instance(&instance(&[("schema/l.cue", "1: one\n")]))
            .unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn unifies_files() {
        let value = DocumentContext::new()
            .build_instance(&instance(&[
                ("schema/a.cue", "name: x\nshared: 1\n"),
                ("schema/b.cue", "other: true\nshared: 1\n"),
            ]))
            .unwrap();
        assert_eq!(value, json!({"name": "x", "other": true, "shared": 1}));
    }

    #[test]
    fn conflicting_fields() {
        let err = DocumentContext::new()
            .build_instance(&instance(&[
                ("schema/a.cue", "name: x\n"),
                ("schema/b.cue", "name: y\n"),
            ]))
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::Conflict {
                field: "name".to_string(),
                first: "schema/a.cue".to_string(),
                second: "schema/b.cue".to_string(),
            }
        );
    }

    #[test]
    fn caches_by_content() {
        let ctx = DocumentContext::new();
        let inst = instance(&[("schema/l.cue", "name: x\n")]);
        let a = ctx.build_instance(&inst).unwrap();
        let b = ctx.build_instance(&inst).unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.cached_values(), 1);

        ctx.build_instance(&instance(&[("schema/l.cue", "name: y\n")]))
            .unwrap();
        assert_eq!(ctx.cached_values(), 2);
    }

    #[test]
    fn clear_cache_drops_interned_values() {
        let ctx = DocumentContext::new();
        let inst = instance(&[("schema/l.cue", "name: x\n")]);
        let before = ctx.build_instance(&inst).unwrap();
        ctx.clear_cache();
        assert_eq!(ctx.cached_values(), 0);

        assert_eq!(ctx.build_instance(&inst).unwrap(), before);
        assert_eq!(ctx.cached_values(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let ctx = DocumentContext::new();
        let _ = ctx.build_instance(&instance(&[("schema/l.cue", "[")]));
        assert_eq!(ctx.cached_values(), 0);
    }
}
