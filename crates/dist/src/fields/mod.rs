//! # Manifest Field Catalog
//!
//! Computes the value each entry-point field should hold. Every function here is pure:
//! the result depends only on the entry point's dist name and, for `browser`, whether
//! the entry point has a module build.
//!
//! | field      | expected value                                    |
//! |------------|---------------------------------------------------|
//! | `main`     | `dist/<name>.cjs.js`                              |
//! | `module`   | `dist/<name>.esm.js`                              |
//! | `umd:main` | `dist/<name>.umd.min.js`                          |
//! | `browser`  | `./dist/<name>.cjs.js` to `./dist/<name>.browser.cjs.js`, and the same for `esm` |
//! | `exports`  | see [`exports::exports`]                          |

use indexmap::IndexMap;

use crate::manifest::{Field, FieldValue};
use crate::project::Entrypoint;

pub mod exports;

/// The infix browser builds carry in their file names.
pub const BROWSER_TARGET: &str = "browser";

/// The infix worker builds carry in their file names.
pub const WORKER_TARGET: &str = "worker";

/// The expected `main` field.
pub fn main(entrypoint: &Entrypoint) -> FieldValue {
    FieldValue::Path(format!("dist/{}.cjs.js", entrypoint.dist_name()))
}

/// The expected `module` field.
pub fn module(entrypoint: &Entrypoint) -> FieldValue {
    FieldValue::Path(format!("dist/{}.esm.js", entrypoint.dist_name()))
}

/// The expected `umd:main` field.
pub fn umd_main(entrypoint: &Entrypoint) -> FieldValue {
    FieldValue::Path(format!("dist/{}.umd.min.js", entrypoint.dist_name()))
}

/// The expected `browser` field.
pub fn browser(entrypoint: &Entrypoint, has_module: bool) -> FieldValue {
    let name = entrypoint.dist_name();
    let mut map = IndexMap::new();
    map.insert(
        format!("./dist/{name}.cjs.js"),
        format!("./dist/{name}.{BROWSER_TARGET}.cjs.js"),
    );
    if has_module {
        map.insert(
            format!("./dist/{name}.esm.js"),
            format!("./dist/{name}.{BROWSER_TARGET}.esm.js"),
        );
    }
    FieldValue::PathMap(map)
}

/// The expected value of a per-entry-point field.
///
/// Returns `None` for [`Field::Exports`], which is computed for a whole package.
pub fn expected(entrypoint: &Entrypoint, field: Field, has_module: bool) -> Option<FieldValue> {
    match field {
        Field::Main => Some(main(entrypoint)),
        Field::Module => Some(module(entrypoint)),
        Field::UmdMain => Some(umd_main(entrypoint)),
        Field::Browser => Some(browser(entrypoint, has_module)),
        Field::Exports => None,
    }
}
