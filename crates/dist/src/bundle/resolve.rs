//! Import resolution confined to one package.
//!
//! Every import is first resolved by the bundler. What it cannot resolve is either a
//! dependency missing from the manifest (a warning, the import becomes an empty module)
//! or a broken relative import (an error). What it does resolve must stay inside the
//! package directory, unless it is virtual or left external.

use std::path::Path;

use path_clean::PathClean;

use super::{EMPTY_STUB_ID, Resolve, ResolvedId};
use crate::error::{DiagnosticKind, Diagnostics, Error, FatalError, Result};
use crate::project::{Package, to_slash};

/// A resolve hook rejecting imports which leave their package.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryResolver<'p> {
    package: &'p Package,
}

impl<'p> BoundaryResolver<'p> {
    /// Creates a resolver for the modules of `package`.
    pub fn new(package: &'p Package) -> Self {
        Self { package }
    }

    /// Resolves `specifier`, recording rejected imports in `diagnostics`.
    ///
    /// Rejected imports resolve to [`EMPTY_STUB_ID`] so bundling can carry on and report
    /// every problem at once. A relative import which cannot be resolved at all fails
    /// immediately.
    pub fn resolve_id(
        &self,
        resolver: &impl Resolve,
        specifier: &str,
        importer: Option<&Path>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ResolvedId> {
        let name = self.package.name();

        let Some(resolved) = resolver.resolve(specifier, importer) else {
            if !specifier.starts_with('.') {
                let by = self
                    .relative(importer)
                    .map(|i| format!(" by \"{}\"", i))
                    .unwrap_or_default();
                diagnostics.push(FatalError::new(
                    DiagnosticKind::MissingDependency,
                    format!(
                        "\"{}\" is imported{} but the package is not specified in dependencies \
                         or peerDependencies",
                        specifier, by
                    ),
                    name,
                ));
                return Ok(stub());
            }
            let from = self
                .relative(importer)
                .map(|i| format!(" from {}", i))
                .unwrap_or_default();
            return Err(Error::UnresolvableImport {
                message: format!("Could not resolve {}{}", specifier, from),
                package: name.to_owned(),
            });
        };

        if specifier.starts_with('\0')
            || resolved.id.starts_with('\0')
            || resolved.external
            || self.contains(Path::new(&resolved.id))
        {
            return Ok(resolved);
        }

        let importer = self
            .relative(importer)
            .map(|i| format!("\"{}\"", i))
            .unwrap_or_else(|| "a module".into());
        diagnostics.push(FatalError::new(
            DiagnosticKind::BoundaryViolation,
            format!(
                "all relative imports in a package should only import modules inside of their \
                 package directory but {} is importing \"{}\"",
                importer, specifier
            ),
            name,
        ));
        Ok(stub())
    }

    /// Loads the stub module; every other id is left to the bundler.
    pub fn load(&self, id: &str) -> Option<&'static str> {
        (id == EMPTY_STUB_ID).then_some("")
    }

    fn contains(&self, id: &Path) -> bool {
        id.clean().starts_with(self.package.directory())
    }

    fn relative(&self, importer: Option<&Path>) -> Option<String> {
        let importer = importer?;
        let relative = pathdiff::diff_paths(importer, self.package.directory())
            .unwrap_or_else(|| importer.to_path_buf());
        Some(to_slash(&relative))
    }
}

fn stub() -> ResolvedId {
    ResolvedId {
        id: EMPTY_STUB_ID.to_owned(),
        external: false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;
    use crate::manifest::Manifest;
    use crate::project::Project;

    const PACKAGE_DIR: &str = "/repo/packages/package-one";
    const IMPORTER: &str = "/repo/packages/package-one/src/index.js";

    fn package() -> anyhow::Result<Package> {
        let project = Project::new("repo", "/repo", Default::default())?;
        let manifest = Manifest::try_from(json!({ "name": "package-one" }))?;
        let mut pkg = Package::new(&project, PACKAGE_DIR, manifest)?;
        pkg.add_entrypoint("src/index.js", None)?;
        Ok(pkg)
    }

    /// Resolves relative specifiers against the importer, leaves bare ones unresolved.
    fn filesystem(specifier: &str, importer: Option<&Path>) -> Option<ResolvedId> {
        if specifier.starts_with("./missing") {
            return None;
        }
        if specifier == "react" {
            return Some(ResolvedId {
                id: "react".into(),
                external: true,
            });
        }
        if !specifier.starts_with('.') {
            return None;
        }
        let dir = importer?.parent()?;
        let id = dir.join(format!("{}.js", specifier)).clean();
        Some(ResolvedId {
            id: id.to_string_lossy().into_owned(),
            external: false,
        })
    }

    #[test]
    fn imports_inside_the_package() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();

        let resolved =
            plugin.resolve_id(&filesystem, "./other", Some(Path::new(IMPORTER)), &mut diagnostics)?;
        assert_eq!(resolved.id, "/repo/packages/package-one/src/other.js");

        let external =
            plugin.resolve_id(&filesystem, "react", Some(Path::new(IMPORTER)), &mut diagnostics)?;
        assert!(external.external);
        assert!(diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn boundary_violation() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();

        let resolved = plugin.resolve_id(
            &filesystem,
            "../../other-package/internal",
            Some(Path::new(IMPORTER)),
            &mut diagnostics,
        )?;
        assert_eq!(resolved.id, EMPTY_STUB_ID);
        assert_eq!(plugin.load(&resolved.id), Some(""));

        let items = diagnostics.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, DiagnosticKind::BoundaryViolation);
        assert_eq!(
            items[0].message,
            "all relative imports in a package should only import modules inside of their \
             package directory but \"src/index.js\" is importing \"../../other-package/internal\""
        );
        assert!(matches!(diagnostics.finish(), Err(Error::Batch(items)) if items.len() == 1));
        Ok(())
    }

    #[test]
    fn sibling_package_from_the_package_root() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();
        let importer = Path::new("/repo/packages/package-one/index.js");

        let resolved = plugin.resolve_id(
            &filesystem,
            "../other-package/internal",
            Some(importer),
            &mut diagnostics,
        )?;
        assert_eq!(resolved.id, EMPTY_STUB_ID);
        assert_eq!(
            diagnostics.items()[0].message,
            "all relative imports in a package should only import modules inside of their \
             package directory but \"index.js\" is importing \"../other-package/internal\""
        );
        assert_eq!(diagnostics.items()[0].package_name, "package-one");
        Ok(())
    }

    #[test]
    fn sibling_with_a_shared_prefix_is_outside() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();
        plugin.resolve_id(
            &filesystem,
            "../../package-one-utils/index",
            Some(Path::new(IMPORTER)),
            &mut diagnostics,
        )?;
        assert_eq!(diagnostics.items().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_dependency_only_warns() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();

        let resolved =
            plugin.resolve_id(&filesystem, "lodash", Some(Path::new(IMPORTER)), &mut diagnostics)?;
        assert_eq!(resolved.id, EMPTY_STUB_ID);
        assert_eq!(
            diagnostics.items()[0].message,
            "\"lodash\" is imported by \"src/index.js\" but the package is not specified in \
             dependencies or peerDependencies"
        );
        assert!(diagnostics.finish().is_ok());
        Ok(())
    }

    #[test]
    fn unresolved_relative_import_fails() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();

        let err = plugin
            .resolve_id(&filesystem, "./missing", Some(Path::new(IMPORTER)), &mut diagnostics)
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not resolve ./missing from src/index.js");
        assert_eq!(err.package_name(), Some("package-one"));
        assert!(diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn virtual_modules_pass_through() -> anyhow::Result<()> {
        let pkg = package()?;
        let plugin = BoundaryResolver::new(&pkg);
        let mut diagnostics = Diagnostics::default();
        let virtual_module = |_: &str, _: Option<&Path>| {
            Some(ResolvedId {
                id: "\0commonjsHelpers.js".into(),
                external: false,
            })
        };
        let resolved = plugin.resolve_id(&virtual_module, "\0commonjsHelpers.js", None, &mut diagnostics)?;
        assert_eq!(resolved.id, "\0commonjsHelpers.js");
        assert_eq!(plugin.load(&resolved.id), None);
        assert!(diagnostics.is_empty());
        Ok(())
    }
}
