//! # Exports Map Synthesis
//!
//! Builds the conditional `exports` map of a package. Consumers resolve conditions
//! first-match, so the key order produced here is part of the contract:
//!
//! - `./package.json` always comes first and maps to itself.
//! - Entry points follow in declaration order, `.` for the root and `./<subpath>`
//!   for nested ones.
//! - Within an entry point: `worker`, `browser`, `production`, `module`, `default`.
//!
//! ```json
//! {
//!   "./package.json": "./package.json",
//!   ".": {
//!     "browser": {
//!       "production": {
//!         "module": "./dist/pkg.browser.esm.prod.js",
//!         "default": "./dist/pkg.browser.cjs.prod.js"
//!       },
//!       "module": "./dist/pkg.browser.esm.dev.js",
//!       "default": "./dist/pkg.browser.cjs.js"
//!     },
//!     "production": {
//!       "module": "./dist/pkg.esm.prod.js",
//!       "default": "./dist/pkg.cjs.prod.js"
//!     },
//!     "module": "./dist/pkg.esm.dev.js",
//!     "default": "./dist/pkg.cjs.js"
//!   }
//! }
//! ```

use super::{BROWSER_TARGET, WORKER_TARGET};
use crate::manifest::{Conditions, ExportsMap, FieldValue, MANIFEST_NAME};
use crate::project::{Entrypoint, Package};

/// The self-referencing key every generated map starts with.
pub const PACKAGE_JSON_KEY: &str = "./package.json";

struct Paths<'a> {
    prefix: String,
    dist_name: &'a str,
    has_module: bool,
}

impl Paths<'_> {
    /// `{ module?, default }` for one build target and environment.
    fn env(&self, target: Option<&str>, env: Option<&str>) -> ExportsMap {
        let target = target.map(|t| format!("{t}.")).unwrap_or_default();
        let mut map = ExportsMap::new();
        if self.has_module {
            // esm has no conditional require, so the bare condition points at the dev build
            let env = env.map(|e| format!("{e}.")).unwrap_or_else(|| "dev.".into());
            map.insert(
                "module".into(),
                Conditions::Target(format!(
                    "./{}dist/{}.{target}esm.{env}js",
                    self.prefix, self.dist_name
                )),
            );
        }
        let env = env.map(|e| format!("{e}.")).unwrap_or_default();
        map.insert(
            "default".into(),
            Conditions::Target(format!(
                "./{}dist/{}.{target}cjs.{env}js",
                self.prefix, self.dist_name
            )),
        );
        map
    }

    /// `{ production: {..}, module?, default }` for one build target.
    fn target(&self, target: Option<&str>) -> ExportsMap {
        let mut map = ExportsMap::new();
        map.insert(
            "production".into(),
            Conditions::Nested(self.env(target, Some("prod"))),
        );
        map.extend(self.env(target, None));
        map
    }
}

/// Synthesizes the `exports` map of `package`.
///
/// `has_module` reports whether an entry point has (or is about to have) a module
/// build. Returns `None` when the package does not opt into an `exports` map.
pub fn exports(package: &Package, has_module: impl Fn(&Entrypoint) -> bool) -> Option<FieldValue> {
    let targets = package.export_targets()?;

    let mut map = ExportsMap::new();
    map.insert(
        PACKAGE_JSON_KEY.into(),
        Conditions::Target(format!("./{MANIFEST_NAME}")),
    );

    for entrypoint in package.entrypoints() {
        let (key, prefix) = if entrypoint.is_root() {
            (".".to_owned(), String::new())
        } else {
            (
                format!("./{}", entrypoint.subpath()),
                format!("{}/", entrypoint.subpath()),
            )
        };
        let paths = Paths {
            prefix,
            dist_name: entrypoint.dist_name(),
            has_module: targets.module && has_module(entrypoint),
        };

        let mut conditions = ExportsMap::new();
        if targets.worker {
            conditions.insert(
                WORKER_TARGET.into(),
                Conditions::Nested(paths.target(Some(WORKER_TARGET))),
            );
        }
        if targets.browser {
            conditions.insert(
                BROWSER_TARGET.into(),
                Conditions::Nested(paths.target(Some(BROWSER_TARGET))),
            );
        }
        conditions.extend(paths.target(None));
        map.insert(key, Conditions::Nested(conditions));
    }

    if let Some(extra) = package.exports_extra() {
        for (key, value) in extra {
            if key == PACKAGE_JSON_KEY {
                tracing::warn!(
                    package = %package.name(),
                    key = %key,
                    "ignoring `exports.extra` entry, this key is always generated"
                );
                continue;
            }
            if map.contains_key(key) {
                tracing::warn!(
                    package = %package.name(),
                    key = %key,
                    "`exports.extra` overrides a generated entry"
                );
            }
            map.insert(key.clone(), Conditions::Extra(value.clone()));
        }
    }

    Some(FieldValue::Conditions(map))
}

#[cfg(test)]
mod tests;
