//! # Bundler Plugins
//!
//! The bundler itself is an external collaborator; this module only models the parts
//! of its plugin interface the plugins here need.
//!
//! - [`resolve::BoundaryResolver`] keeps every import inside its package.
//! - [`entry::DualEntryEmitter`] writes a router choosing between development and
//!   production builds, and a Flow shim re-exporting the source's types.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

pub mod entry;
pub mod resolve;

/// The id resolutions are redirected to when an import is rejected.
///
/// The leading NUL marks the id as virtual, so no other plugin tries to load it.
pub const EMPTY_STUB_ID: &str = "\0distill:empty-stub";

//================================================================================================
// Types
//================================================================================================

/// A module id produced by the bundler's resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    /// The resolved id, usually an absolute path.
    pub id: String,
    /// Whether the bundler leaves the module out of the bundle.
    pub external: bool,
}

/// The bundler's own resolution, consulted before any boundary check.
pub trait Resolve {
    /// Resolves `specifier` imported from `importer`, or `None` if nothing matches.
    fn resolve(&self, specifier: &str, importer: Option<&Path>) -> Option<ResolvedId>;
}

impl<F> Resolve for F
where
    F: Fn(&str, Option<&Path>) -> Option<ResolvedId>,
{
    fn resolve(&self, specifier: &str, importer: Option<&Path>) -> Option<ResolvedId> {
        self(specifier, importer)
    }
}

/// A generated chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// The output file name, relative to the output directory.
    pub file_name: String,
    /// Whether the chunk is an entry chunk.
    pub is_entry: bool,
    /// The module the chunk is a facade for, if any.
    pub facade_module_id: Option<PathBuf>,
    /// The names the chunk exports.
    pub exports: Vec<String>,
}

/// A generated or emitted asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAsset {
    /// The output file name, relative to the output directory.
    pub file_name: String,
    /// The asset contents.
    pub source: String,
}

/// One file of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    /// A JavaScript chunk.
    Chunk(OutputChunk),
    /// Any other file.
    Asset(OutputAsset),
}

/// The output options of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// The directory the bundle is written to.
    pub dir: PathBuf,
}

/// The files of a bundle, keyed by file name.
pub type OutputBundle = IndexMap<String, OutputFile>;
