//! # Project Discovery
//!
//! Reads a project from disk: the root manifest, the package directories matched by
//! its `packages` globs, and every package's entry point sources under `src`.
//! Manifests are written back through [`DiskStore`], which replaces each file
//! atomically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobBuilder, GlobMatcher};
use path_clean::PathClean;
use tempfile::NamedTempFile;
use walkdir::{DirEntry, WalkDir};

use super::{ManifestStore, Package, Project, ProjectConfig, SOURCE_DIR, to_slash};
use crate::error::{Error, Result};
use crate::manifest::{MANIFEST_NAME, Manifest};

//================================================================================================
// Types
//================================================================================================

/// Persists manifests to the filesystem.
#[derive(Debug, Default)]
pub struct DiskStore;

//================================================================================================
// Impls
//================================================================================================

impl ManifestStore for DiskStore {
    fn write(&mut self, path: &Path, manifest: &Manifest) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no parent directory for {}", path.display()),
            )
        })?;
        let content = manifest.to_pretty_string().map_err(|source| Error::Json {
            source,
            path: path.to_owned(),
        })?;
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::with_prefix_in(format!(".{}", MANIFEST_NAME), dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path)?;
        tracing::debug!(path = %path.display(), "wrote manifest");
        Ok(())
    }
}

//================================================================================================
// Functions
//================================================================================================

/// Loads the project rooted at `root`.
///
/// A relative `root` is resolved against the current directory first, so every path in
/// the loaded project is absolute.
pub fn load(root: &Path) -> Result<Project> {
    let root = std::path::absolute(root)?.clean();
    let root = root.as_path();
    let root_manifest = read_manifest(&root.join(MANIFEST_NAME))?;
    let config: ProjectConfig = root_manifest.config().map_err(|source| Error::Json {
        source,
        path: root.join(MANIFEST_NAME),
    })?;
    let name = root_manifest
        .name()
        .map(ToOwned::to_owned)
        .or_else(|| root.file_name().map(|f| f.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let package_dirs = if config.packages.is_empty() {
        vec![root.to_path_buf()]
    } else {
        find_packages(root, &config.packages)?
    };

    let mut project = Project::new(name, root, config)?;
    for dir in package_dirs {
        let manifest = if dir == root {
            root_manifest.clone()
        } else {
            read_manifest(&dir.join(MANIFEST_NAME))?
        };
        let mut package = Package::new(&project, &dir, manifest)?;
        for source in find_sources(&package)? {
            let subpath_manifest = entry_manifest(&package, &source)?;
            package.add_entrypoint(&source, subpath_manifest)?;
        }
        if package.entrypoints().is_empty() {
            return Err(Error::NoEntrypoints {
                package: package.name().to_owned(),
            });
        }
        tracing::debug!(
            package = %package.name(),
            entrypoints = package.entrypoints().len(),
            "loaded package"
        );
        project.add_package(package)?;
    }
    Ok(project)
}

fn read_manifest(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path).inspect_err(|_| {
        tracing::error!(path = %path.display(), "no manifest exists");
    })?;
    Manifest::parse(&content, path)
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0
        || !entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.') || s == "node_modules")
}

/// Finds package directories under `root` matching any of `globs`, in path order.
fn find_packages(root: &Path, globs: &[String]) -> Result<Vec<PathBuf>> {
    let matchers = globs
        .iter()
        .map(|g| {
            GlobBuilder::new(g)
                .literal_separator(true)
                .build()
                .map(|g| g.compile_matcher())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible)
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if matchers.iter().any(|m| m.is_match(relative))
            && entry.path().join(MANIFEST_NAME).is_file()
        {
            found.push(entry.path().to_path_buf());
        }
    }
    Ok(found)
}

/// Finds entry point sources, one glob at a time so declaration order is kept.
fn find_sources(package: &Package) -> Result<Vec<PathBuf>> {
    let src = package.directory().join(SOURCE_DIR);
    let files: Vec<PathBuf> = if src.is_dir() {
        WalkDir::new(&src)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_visible)
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    } else {
        Vec::new()
    };

    let mut sources: Vec<PathBuf> = Vec::new();
    for glob in &package.config().entrypoints {
        let matcher: GlobMatcher = Glob::new(glob)?.compile_matcher();
        let mut matched = false;
        for file in &files {
            let relative = file.strip_prefix(&src).unwrap_or(file);
            if matcher.is_match(relative) {
                matched = true;
                if !sources.contains(file) {
                    sources.push(file.clone());
                }
            }
        }
        if !matched {
            return Err(Error::MissingSource {
                source_path: format!("{}/{}", SOURCE_DIR, strip_extension(glob)),
                package: package.name().to_owned(),
            });
        }
    }
    Ok(sources)
}

/// Reads a nested entry point's manifest, if it exists.
fn entry_manifest(package: &Package, source: &Path) -> Result<Option<Manifest>> {
    let subpath = super::entrypoint_subpath(package.directory(), source);
    if subpath.is_empty() {
        return Ok(None);
    }
    let path = package.directory().join(&subpath).join(MANIFEST_NAME);
    if path.is_file() {
        read_manifest(&path).map(Some)
    } else {
        tracing::debug!(path = %path.display(), "entrypoint manifest does not exist yet");
        Ok(None)
    }
}

/// `index.{js,ts}` becomes `index`, `nested/one.js` becomes `nested/one`.
fn strip_extension(glob: &str) -> String {
    let path = Path::new(glob);
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file.split('.').next().unwrap_or_default();
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            format!("{}/{}", to_slash(parent), stem)
        },
        _ => stem.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn write(root: &Path, path: &str, content: &str) -> anyhow::Result<()> {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, content)?;
        Ok(())
    }

    #[test]
    fn globs_without_sources() {
        assert_eq!(strip_extension("index.{js,jsx,ts,tsx}"), "index");
        assert_eq!(strip_extension("nested/one.js"), "nested/one");
    }

    #[test]
    fn no_entrypoint() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        write(tmp.path(), "package.json", r#"{ "name": "no-entrypoint" }"#)?;

        let err = load(tmp.path()).unwrap_err();
        assert!(matches!(
            &err,
            Error::MissingSource { source_path, .. } if source_path == "src/index"
        ));
        Ok(())
    }

    #[test]
    fn three_entrypoints() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path();
        let manifest = json!({
            "name": "something",
            "distill": { "entrypoints": ["index.js", "one.js", "two.js"] }
        });
        write(root, "package.json", &manifest.to_string())?;
        write(root, "src/index.js", "export let something = true;")?;
        write(root, "src/one.js", "export let something = true;")?;
        write(root, "src/two.js", "export let something = true;")?;
        write(root, "one/package.json", "{}")?;

        let project = load(root)?;
        let pkg = &project.packages()[0];
        let names: Vec<_> = pkg.entrypoints().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["something", "something/one", "something/two"]);
        assert!(pkg.entrypoints()[1].manifest_exists());
        assert!(!pkg.entrypoints()[2].manifest_exists());
        Ok(())
    }

    #[test]
    fn monorepo() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path();
        write(
            root,
            "package.json",
            r#"{ "name": "monorepo", "private": true, "distill": { "packages": ["packages/*"] } }"#,
        )?;
        for name in ["package-one", "package-two"] {
            let manifest = json!({ "name": format!("@some-scope/{}", name), "version": "1.0.0" });
            write(root, &format!("packages/{}/package.json", name), &manifest.to_string())?;
            write(root, &format!("packages/{}/src/index.js", name), "export default 1;")?;
        }
        write(root, "packages/not-a-package/README.md", "")?;

        let project = load(root)?;
        let names: Vec<_> = project.packages().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["@some-scope/package-one", "@some-scope/package-two"]);
        Ok(())
    }

    #[test]
    fn monorepo_through_a_relative_root() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path();
        write(
            root,
            "package.json",
            r#"{ "name": "monorepo", "distill": { "packages": ["packages/*"] } }"#,
        )?;
        write(root, "packages/a/package.json", r#"{ "name": "a" }"#)?;
        write(root, "packages/a/src/index.js", "export default 1;")?;

        let relative = pathdiff::diff_paths(root, std::env::current_dir()?)
            .ok_or_else(|| anyhow::anyhow!("no relative path to the fixture"))?;
        let project = load(&Path::new(".").join(relative))?;

        let pkg = &project.packages()[0];
        let entrypoint = &pkg.entrypoints()[0];
        assert_eq!(entrypoint.name(), "a");
        assert!(entrypoint.is_root());
        assert_eq!(entrypoint.manifest_path(), root.join("packages/a/package.json"));
        assert_eq!(pkg.manifest_path(), root.join("packages/a/package.json"));
        Ok(())
    }

    #[test]
    fn sources_for_the_same_entrypoint() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path();
        write(root, "package.json", r#"{ "name": "pkg" }"#)?;
        write(root, "src/index.js", "export default 1;")?;
        write(root, "src/index.ts", "export default 1;")?;

        let err = load(root).unwrap_err();
        assert!(matches!(&err, Error::DuplicateEntrypoint(name) if name == "pkg"));
        Ok(())
    }

    #[test]
    fn disk_store_round_trips() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("nested/package.json");
        let manifest = Manifest::try_from(json!({ "name": "a", "main": "dist/a.cjs.js" }))?;
        DiskStore.write(&path, &manifest)?;
        let content = fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "{\n  \"name\": \"a\",\n  \"main\": \"dist/a.cjs.js\"\n}\n"
        );
        assert_eq!(read_manifest(&path)?, manifest);
        Ok(())
    }
}
