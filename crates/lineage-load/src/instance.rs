//! # Instance Resolution
//!
//! Resolves the compilable unit ("instance") rooted at a directory of an
//! overlay filesystem. The [`InstanceLoader`] trait is the seam for loaders
//! with other layout rules; [`ModuleLoader`] implements the module layout
//! the overlay builder produces:
//!
//! 1. A module descriptor at `cue.mod/module.cue` declaring
//!    `module: "<identity>"`.
//! 2. Exactly one schema source file directly inside the target directory.
//!    Files in subdirectories and files with other extensions are ignored.

use lineage_core::{ModulePath, VirtualFile, VirtualFs, MODULE_DESCRIPTOR_PATH};

use crate::config::LoaderConfig;
use crate::error::InstanceError;

/// A resolved, not yet compiled, schema instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    module: String,
    dir: ModulePath,
    files: Vec<VirtualFile>,
}

impl Instance {
    pub fn new(module: impl Into<String>, dir: ModulePath, files: Vec<VirtualFile>) -> Self {
        Self {
            module: module.into(),
            dir,
            files,
        }
    }

    /// Identity of the module the instance belongs to.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Module-relative directory of the instance.
    pub fn dir(&self) -> &ModulePath {
        &self.dir
    }

    /// Fully qualified import path: `<module>/<dir>`.
    pub fn import_path(&self) -> String {
        format!("{}/{}", self.module, self.dir)
    }

    /// Source files making up the instance, sorted by path.
    pub fn files(&self) -> &[VirtualFile] {
        &self.files
    }
}

/// Resolves an [`Instance`] from an overlay filesystem.
pub trait InstanceLoader: Send + Sync {
    /// Resolve the instance rooted at `dir`.
    fn load_instance(&self, overlay: &VirtualFs, dir: &ModulePath)
        -> Result<Instance, InstanceError>;
}

/// Loader for the single-lineage-file module layout.
#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    config: LoaderConfig,
}

impl ModuleLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl InstanceLoader for ModuleLoader {
    fn load_instance(
        &self,
        overlay: &VirtualFs,
        dir: &ModulePath,
    ) -> Result<Instance, InstanceError> {
        let descriptor =
            overlay
                .get(MODULE_DESCRIPTOR_PATH)
                .ok_or_else(|| InstanceError::MissingDescriptor {
                    path: MODULE_DESCRIPTOR_PATH.to_string(),
                })?;
        let module = parse_module_identity(descriptor.data())?;

        let sources: Vec<&VirtualFile> = overlay
            .read_dir(dir.as_str())
            .into_iter()
            .filter(|f| {
                f.extension()
                    .is_some_and(|ext| self.config.is_source_extension(ext))
            })
            .collect();

        match sources.as_slice() {
            [] => Err(InstanceError::NoSourceFiles {
                dir: dir.to_string(),
            }),
            [single] => {
                tracing::debug!(
                    module = %module,
                    dir = %dir,
                    file = single.path(),
                    "resolved instance"
                );
                Ok(Instance::new(module, dir.clone(), vec![(*single).clone()]))
            }
            many => Err(InstanceError::AmbiguousRoot {
                dir: dir.to_string(),
                files: many.iter().map(|f| f.path().to_string()).collect(),
            }),
        }
    }
}

/// Extract the identity from a `module: "<identity>"` declaration.
///
/// Blank lines and `//` comments are skipped; the first other line must be
/// the declaration.
fn parse_module_identity(data: &[u8]) -> Result<String, InstanceError> {
    let malformed = |reason: &str| InstanceError::MalformedDescriptor {
        path: MODULE_DESCRIPTOR_PATH.to_string(),
        reason: reason.to_string(),
    };

    let text = std::str::from_utf8(data).map_err(|_| malformed("not valid UTF-8"))?;
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("//"))
        .ok_or_else(|| malformed("empty descriptor"))?;

    let value = line
        .strip_prefix("module:")
        .ok_or_else(|| malformed("expected a module declaration"))?
        .trim();
    let identity = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| malformed("module identity must be a quoted string"))?;

    if identity.is_empty() {
        return Err(malformed("module identity is empty"));
    }
    Ok(identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> ModulePath {
        ModulePath::new("public/schema").unwrap()
    }

    fn descriptor() -> VirtualFile {
        VirtualFile::new(MODULE_DESCRIPTOR_PATH, b"module: \"github.com/grafana/grafana\"".to_vec())
    }

    fn overlay(extra: &[(&str, &str)]) -> VirtualFs {
        VirtualFs::from_files(
            std::iter::once(descriptor()).chain(
                extra
                    .iter()
                    .map(|(p, d)| VirtualFile::new(*p, d.as_bytes().to_vec())),
            ),
        )
    }

    #[test]
    fn resolves_single_file() {
        let fs = overlay(&[("public/schema/lineage.cue", "name: \"x\"")]);
        let inst = ModuleLoader::default().load_instance(&fs, &dir()).unwrap();
        assert_eq!(inst.module(), "github.com/grafana/grafana");
        assert_eq!(inst.import_path(), "github.com/grafana/grafana/public/schema");
        assert_eq!(inst.files().len(), 1);
        assert_eq!(inst.files()[0].path(), "public/schema/lineage.cue");
    }

    #[test]
    fn ignores_other_extensions_and_subdirectories() {
        let fs = overlay(&[
            ("public/schema/lineage.cue", "name: \"x\""),
            ("public/schema/README.md", "docs"),
            ("public/schema/nested/other.cue", "y: 1"),
        ]);
        let inst = ModuleLoader::default().load_instance(&fs, &dir()).unwrap();
        assert_eq!(inst.files().len(), 1);
    }

    #[test]
    fn missing_descriptor() {
        let fs = VirtualFs::from_files([VirtualFile::new(
            "public/schema/lineage.cue",
            Vec::new(),
        )]);
        let err = ModuleLoader::default().load_instance(&fs, &dir()).unwrap_err();
        assert!(matches!(err, InstanceError::MissingDescriptor { .. }));
    }

    #[test]
    fn no_source_files() {
        let err = ModuleLoader::default()
            .load_instance(&overlay(&[]), &dir())
            .unwrap_err();
        assert_eq!(
            err,
            InstanceError::NoSourceFiles {
                dir: "public/schema".to_string()
            }
        );
    }

    #[test]
    fn ambiguous_root() {
        let fs = overlay(&[
            ("public/schema/a.cue", ""),
            ("public/schema/b.cue", ""),
        ]);
        let err = ModuleLoader::default().load_instance(&fs, &dir()).unwrap_err();
        match err {
            InstanceError::AmbiguousRoot { files, .. } => {
                assert_eq!(files, vec!["public/schema/a.cue", "public/schema/b.cue"])
            }
            other => panic!("Expected AmbiguousRoot, got: {other}"),
        }
    }

    #[test]
    fn configured_extensions() {
        let config = LoaderConfig {
            source_extensions: vec!["yaml".to_string()],
            ..LoaderConfig::default()
        };
        let fs = overlay(&[
            ("public/schema/lineage.yaml", "name: x"),
            ("public/schema/lineage.cue", "name: \"x\""),
        ]);
        let inst = ModuleLoader::new(config).load_instance(&fs, &dir()).unwrap();
        assert_eq!(inst.files()[0].path(), "public/schema/lineage.yaml");
    }

    #[test]
    fn descriptor_parsing() {
        assert_eq!(
            parse_module_identity(b"// header\n\nmodule: \"example.com/m\"\n").unwrap(),
            "example.com/m"
        );
        assert!(parse_module_identity(b"").is_err());
        assert!(parse_module_identity(b"module: example.com/m").is_err());
        assert!(parse_module_identity(b"package foo").is_err());
        assert!(parse_module_identity(b"module: \"\"").is_err());
        assert!(parse_module_identity(&[0xff, 0xfe]).is_err());
    }
}
