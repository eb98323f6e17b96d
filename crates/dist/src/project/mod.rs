//! # Projects, Packages and Entry Points
//!
//! This module contains the data model every other part of the crate works on.
//!
//! A [`Project`] is the root of a source tree and owns an ordered list of
//! [`Package`]s. Each package owns an ordered list of [`Entrypoint`]s, one for every
//! publicly importable sub-path. Declaration order is preserved throughout since it
//! decides the key order of generated `exports` maps.
//!
//! Everything here is immutable once loaded; reconciliation stages its edits
//! separately and writes them through a [`ManifestStore`].
//!
//! ## Configuration
//!
//! Configuration is read from the `distill` key of each manifest:
//!
//! ```json
//! {
//!   "name": "@scope/pkg",
//!   "distill": {
//!     "entrypoints": ["index.js", "one.js"],
//!     "exports": { "conditions": ["module", "worker"], "extra": { "./x": "./x.js" } },
//!     "umdName": "scopePkg"
//!   }
//! }
//! ```
//!
//! The project root additionally carries `packages`, `distFilenameStrategy` and
//! `experimentalFlags`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use path_clean::PathClean;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::manifest::{MANIFEST_NAME, Manifest};

pub mod loader;

/// The directory entry point sources are declared relative to.
pub const SOURCE_DIR: &str = "src";

//================================================================================================
// Types
//================================================================================================

/// The rule deriving a filesystem-safe base name for build artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistFilenameStrategy {
    /// The entry point's full name, e.g. `@scope/pkg/sub` becomes `scope-pkg-sub`.
    #[default]
    Full,
    /// The package name without its scope, e.g. `@scope/pkg` becomes `pkg`.
    UnscopedPackageName,
}

/// Feature flags which may change without notice.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentalFlags {
    /// Whether `exports` maps are generated.
    #[serde(default)]
    pub exports: bool,
}

/// Project-wide configuration, read from the root manifest.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Globs matching package directories, relative to the project root.
    ///
    /// When empty, the project root is the only package.
    #[serde(default)]
    pub packages: Vec<String>,
    /// The raw `distFilenameStrategy`, validated by [`DistFilenameStrategy::resolve`].
    #[serde(default)]
    pub dist_filename_strategy: Option<Value>,
    /// Experimental features.
    #[serde(default)]
    pub experimental_flags: ExperimentalFlags,
}

/// The `exports` option of a package.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ExportsConfig {
    /// `exports: true` enables the default conditions, `false` disables the map.
    Enabled(bool),
    /// Fine-grained options.
    Options {
        /// The conditions to generate; the defaults are used when absent.
        #[serde(default)]
        conditions: Option<Vec<String>>,
        /// Entries merged verbatim after the generated ones.
        #[serde(default)]
        extra: Option<Map<String, Value>>,
    },
}

/// Which build targets an `exports` map carries conditions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTargets {
    /// `module` conditions for ES module builds.
    pub module: bool,
    /// A `browser` condition.
    pub browser: bool,
    /// A `worker` condition.
    pub worker: bool,
}

/// Package-local configuration.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageConfig {
    /// Globs matching entry point sources, relative to the package's `src` directory.
    #[serde(default = "default_entrypoints")]
    pub entrypoints: Vec<String>,
    /// The `exports` map options.
    #[serde(default)]
    pub exports: Option<ExportsConfig>,
    /// The global name UMD builds are exposed under.
    #[serde(default)]
    pub umd_name: Option<String>,
}

/// The root of a source tree.
#[derive(Debug)]
pub struct Project {
    name: String,
    directory: PathBuf,
    config: ProjectConfig,
    strategy: DistFilenameStrategy,
    packages: Vec<Package>,
}

/// A publishable package and its entry points.
#[derive(Debug)]
pub struct Package {
    name: String,
    directory: PathBuf,
    manifest: Manifest,
    config: PackageConfig,
    strategy: DistFilenameStrategy,
    exports_flag: bool,
    entrypoints: Vec<Entrypoint>,
}

/// One publicly importable sub-path of a package.
#[derive(Debug)]
pub struct Entrypoint {
    name: String,
    subpath: String,
    dist_name: String,
    directory: PathBuf,
    source: PathBuf,
    manifest_path: PathBuf,
    manifest: Manifest,
    manifest_exists: bool,
}

/// The collaborator persisting manifests.
pub trait ManifestStore {
    /// Writes `manifest` to `path`, replacing whatever is there.
    fn write(&mut self, path: &Path, manifest: &Manifest) -> Result<()>;
}

//================================================================================================
// Impls
//================================================================================================

impl DistFilenameStrategy {
    /// Validates a configured strategy; an absent value means [`DistFilenameStrategy::Full`].
    pub fn resolve(raw: Option<&Value>, project: &str) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        raw.as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Configuration {
                message: format!(
                    "distFilenameStrategy is defined in your configuration as {} but the only \
                     accepted values are \"full\" and \"unscoped-package-name\"",
                    raw
                ),
                name: project.to_owned(),
            })
    }

    /// Derives the base name of an entry point's build artifacts.
    pub fn dist_name(self, package_name: &str, entrypoint_name: &str) -> String {
        match self {
            DistFilenameStrategy::Full => entrypoint_name
                .strip_prefix('@')
                .unwrap_or(entrypoint_name)
                .replace('/', "-"),
            DistFilenameStrategy::UnscopedPackageName => package_name
                .rsplit('/')
                .next()
                .unwrap_or(package_name)
                .to_owned(),
        }
    }
}

impl FromStr for DistFilenameStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(DistFilenameStrategy::Full),
            "unscoped-package-name" => Ok(DistFilenameStrategy::UnscopedPackageName),
            other => Err(other.to_owned()),
        }
    }
}

impl Default for ExportTargets {
    fn default() -> Self {
        Self {
            module: true,
            browser: true,
            worker: false,
        }
    }
}

impl ExportTargets {
    fn from_conditions(conditions: &[String]) -> Self {
        let has = |c: &str| conditions.iter().any(|x| x == c);
        Self {
            module: has("module"),
            browser: has("browser"),
            worker: has("worker"),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            entrypoints: default_entrypoints(),
            exports: None,
            umd_name: None,
        }
    }
}

impl Project {
    /// Creates a project without packages, validating its configuration.
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        config: ProjectConfig,
    ) -> Result<Self> {
        let name = name.into();
        let strategy =
            DistFilenameStrategy::resolve(config.dist_filename_strategy.as_ref(), &name)?;
        Ok(Self {
            name,
            directory: directory.into().clean(),
            config,
            strategy,
            packages: Vec::new(),
        })
    }

    /// Adds a package, enforcing that entry point names stay unique across the project.
    pub fn add_package(&mut self, package: Package) -> Result<()> {
        for entrypoint in &package.entrypoints {
            let taken = self
                .packages
                .iter()
                .flat_map(|p| p.entrypoints.iter())
                .any(|e| e.name == entrypoint.name);
            if taken {
                return Err(Error::DuplicateEntrypoint(entrypoint.name.clone()));
            }
        }
        self.packages.push(package);
        Ok(())
    }

    /// The project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The project configuration.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// The dist filename strategy every package of this project uses.
    pub fn strategy(&self) -> DistFilenameStrategy {
        self.strategy
    }

    /// The packages, in discovery order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }
}

impl Package {
    /// Creates a package without entry points.
    pub fn new(
        project: &Project,
        directory: impl Into<PathBuf>,
        manifest: Manifest,
    ) -> Result<Self> {
        let directory = directory.into().clean();
        let name = manifest
            .name()
            .ok_or_else(|| Error::Configuration {
                message: format!(
                    "the package at {} has no `name` field",
                    directory.join(MANIFEST_NAME).display()
                ),
                name: project.name.clone(),
            })?
            .to_owned();
        let config = manifest.config().map_err(|source| Error::Json {
            source,
            path: directory.join(MANIFEST_NAME),
        })?;
        Ok(Self {
            name,
            directory,
            manifest,
            config,
            strategy: project.strategy,
            exports_flag: project.config.experimental_flags.exports,
            entrypoints: Vec::new(),
        })
    }

    /// Adds an entry point for `source`.
    ///
    /// The entry point's directory mirrors the source's location under `src`:
    /// `src/index.js` is the package root, `src/one.js` and `src/one/index.js` both
    /// live in `one`. `manifest` is the entry point's own manifest, if one exists on
    /// disk; it is ignored for the root entry point, which shares the package manifest.
    ///
    /// Two sources mapping to the same entry directory (`src/one.js` and
    /// `src/one/index.js`, or `src/index.js` and `src/index.ts`) are rejected.
    pub fn add_entrypoint(
        &mut self,
        source: impl AsRef<Path>,
        manifest: Option<Manifest>,
    ) -> Result<&Entrypoint> {
        let source = self.directory.join(source.as_ref()).clean();
        let subpath = entrypoint_subpath(&self.directory, &source);
        let name = entrypoint_name(&self.name, &subpath);
        if self.entrypoints.iter().any(|e| e.name == name) {
            return Err(Error::DuplicateEntrypoint(name));
        }
        let dist_name = self.strategy.dist_name(&self.name, &name);
        let directory = self.directory.join(&subpath).clean();
        let manifest_path = directory.join(MANIFEST_NAME);

        let (manifest, manifest_exists) = if subpath.is_empty() {
            (self.manifest.clone(), true)
        } else {
            match manifest {
                Some(m) => (m, true),
                None => (Manifest::default(), false),
            }
        };

        self.entrypoints.push(Entrypoint {
            name,
            subpath,
            dist_name,
            directory,
            source,
            manifest_path,
            manifest,
            manifest_exists,
        });
        Ok(&self.entrypoints[self.entrypoints.len() - 1])
    }

    /// The package name, possibly scoped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The path of the package manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST_NAME)
    }

    /// The package manifest as loaded.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The package configuration.
    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// The resolved dist filename strategy.
    pub fn strategy(&self) -> DistFilenameStrategy {
        self.strategy
    }

    /// The entry points, in declaration order.
    pub fn entrypoints(&self) -> &[Entrypoint] {
        &self.entrypoints
    }

    /// The conditions an `exports` map carries, or `None` when no map should exist.
    pub fn export_targets(&self) -> Option<ExportTargets> {
        if !self.exports_flag {
            return None;
        }
        match self.config.exports.as_ref()? {
            ExportsConfig::Enabled(false) => None,
            ExportsConfig::Enabled(true) => Some(ExportTargets::default()),
            ExportsConfig::Options {
                conditions: Some(conditions),
                ..
            } => Some(ExportTargets::from_conditions(conditions)),
            ExportsConfig::Options { conditions: None, .. } => Some(ExportTargets::default()),
        }
    }

    /// The raw entries merged after the generated `exports` entries.
    pub fn exports_extra(&self) -> Option<&Map<String, Value>> {
        if !self.exports_flag {
            return None;
        }
        match self.config.exports.as_ref()? {
            ExportsConfig::Options { extra, .. } => extra.as_ref(),
            ExportsConfig::Enabled(_) => None,
        }
    }
}

impl Entrypoint {
    /// The fully-qualified name, e.g. `@scope/pkg/one`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entry directory relative to the package, forward-slashed; empty for the root.
    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    /// Whether this is the package's root entry point.
    pub fn is_root(&self) -> bool {
        self.subpath.is_empty()
    }

    /// The base name of this entry point's build artifacts.
    pub fn dist_name(&self) -> &str {
        &self.dist_name
    }

    /// The entry directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The source file.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The path of this entry point's manifest.
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// The manifest as loaded; an empty object when none exists yet.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Whether the manifest exists on disk.
    pub fn manifest_exists(&self) -> bool {
        self.manifest_exists
    }
}

//================================================================================================
// Functions
//================================================================================================

fn default_entrypoints() -> Vec<String> {
    vec!["index.{js,jsx,ts,tsx}".into()]
}

/// Joins a package name and an entry sub-path into a forward-slashed entry point name.
pub fn entrypoint_name(package_name: &str, subpath: &str) -> String {
    if subpath.is_empty() {
        return package_name.to_owned();
    }
    to_slash(&Path::new(package_name).join(subpath).clean())
}

/// The entry directory of `source` relative to `package_dir`.
///
/// Both paths are expected to be clean; a clean relative path under `.` has no `./` prefix.
fn entrypoint_subpath(package_dir: &Path, source: &Path) -> String {
    let relative = if package_dir == Path::new(".") && source.is_relative() {
        source.to_path_buf()
    } else {
        source
            .strip_prefix(package_dir)
            .map(Path::to_path_buf)
            .or_else(|_| pathdiff::diff_paths(source, package_dir).ok_or(()))
            .unwrap_or_else(|_| source.to_path_buf())
    };
    let relative = relative.strip_prefix(SOURCE_DIR).unwrap_or(&relative);
    let without_ext = relative.with_extension("");
    let dir = if without_ext.file_name().is_some_and(|f| f == "index") {
        without_ext.parent().map(Path::to_path_buf).unwrap_or_default()
    } else {
        without_ext
    };
    to_slash(&dir)
}

/// Renders a path with forward slashes regardless of platform.
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
