//! Router and Flow shim generation for dual-mode bundles.
//!
//! Each entry point is bundled twice, to `<name>.dev.js` and `<name>.prod.js`. The file
//! consumers actually import, `<name>.js`, is a small CommonJS router choosing between
//! the two on `NODE_ENV`. Flow sources additionally get a `<name>.js.flow` shim which
//! re-exports the types of the original source.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use lazy_regex::{Lazy, Regex};

use super::{OutputAsset, OutputBundle, OutputFile, OutputOptions};
use crate::error::Result;
use crate::project::to_slash;

static PROD_SUFFIX: Lazy<Regex> = lazy_regex::lazy_regex!(r"\.prod\.js$");
static JS_SUFFIX: Lazy<Regex> = lazy_regex::lazy_regex!(r"\.js$");
static TYPESCRIPT: Lazy<Regex> = lazy_regex::lazy_regex!(r"\.tsx?$");

/// Reads entry sources.
pub trait ReadSource {
    /// Reads the source at `path`.
    fn read(&self, path: &Path) -> Result<String>;
}

/// Reads sources from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

/// A bundle hook emitting routers and Flow shims.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualEntryEmitter;

impl ReadSource for FsSource {
    fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }
}

impl DualEntryEmitter {
    /// Computes the assets to add to `bundle`, each file name at most once.
    pub fn generate_bundle(
        &self,
        options: &OutputOptions,
        bundle: &OutputBundle,
        sources: &impl ReadSource,
    ) -> Result<Vec<OutputAsset>> {
        let mut emitted = Vec::new();
        let mut seen = HashSet::new();
        let mut emit = |asset: OutputAsset| {
            if seen.insert(asset.file_name.clone()) {
                emitted.push(asset);
            }
        };

        for file in bundle.values() {
            let OutputFile::Chunk(chunk) = file else {
                continue;
            };
            let Some(facade) = chunk.facade_module_id.as_deref() else {
                continue;
            };
            // the router takes the place of the dev build's name otherwise
            if !chunk.is_entry || chunk.file_name.ends_with(".dev.js") {
                continue;
            }

            let main_path = PROD_SUFFIX.replace(&chunk.file_name, ".js").into_owned();
            let facade_name = facade.to_string_lossy();

            if !TYPESCRIPT.is_match(&facade_name) {
                let source = sources.read(facade)?;
                if source.contains("@flow") {
                    let output = options.dir.join(&chunk.file_name);
                    let from = output.parent().unwrap_or(&options.dir);
                    let relative = pathdiff::diff_paths(facade, from)
                        .unwrap_or_else(|| facade.to_path_buf());
                    tracing::debug!(chunk = %chunk.file_name, "emitting flow shim");
                    emit(OutputAsset {
                        file_name: format!("{}.flow", main_path),
                        source: flow_shim(
                            &to_slash(&relative),
                            chunk.exports.iter().any(|e| e == "default"),
                        ),
                    });
                }
            }

            emit(OutputAsset {
                source: router(&main_path),
                file_name: main_path,
            });
        }
        Ok(emitted)
    }
}

/// The CommonJS router for the build at `main_path`.
pub fn router(main_path: &str) -> String {
    let base = Path::new(main_path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prod = JS_SUFFIX.replace(&base, ".prod.js");
    let dev = JS_SUFFIX.replace(&base, ".dev.js");
    format!(
        "'use strict';\n\nif (process.env.NODE_ENV === \"production\") {{\n  module.exports = \
         require(\"./{prod}\");\n}} else {{\n  module.exports = require(\"./{dev}\");\n}}\n"
    )
}

/// A Flow declaration file re-exporting the source at `relative`.
pub fn flow_shim(relative: &str, default_export: bool) -> String {
    let path = serde_json::Value::from(relative).to_string();
    let mut shim = format!("// @flow\nexport * from {};", path);
    if default_export {
        shim.push_str(&format!("\nexport {{ default }} from {};", path));
    }
    shim.push('\n');
    shim
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::bundle::OutputChunk;

    struct Sources(Vec<(&'static str, &'static str)>);

    impl ReadSource for Sources {
        fn read(&self, path: &Path) -> Result<String> {
            self.0
                .iter()
                .find(|(p, _)| Path::new(p) == path)
                .map(|(_, s)| s.to_string())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }
    }

    fn chunk(file_name: &str, facade: Option<&str>, exports: &[&str]) -> (String, OutputFile) {
        (
            file_name.to_owned(),
            OutputFile::Chunk(OutputChunk {
                file_name: file_name.to_owned(),
                is_entry: true,
                facade_module_id: facade.map(PathBuf::from),
                exports: exports.iter().map(|e| e.to_string()).collect(),
            }),
        )
    }

    fn options() -> OutputOptions {
        OutputOptions {
            dir: PathBuf::from("/repo/pkg"),
        }
    }

    #[test]
    fn router_prefers_production() {
        insta::assert_snapshot!(router("dist/pkg.cjs.js"), @r#"
        'use strict';

        if (process.env.NODE_ENV === "production") {
          module.exports = require("./pkg.cjs.prod.js");
        } else {
          module.exports = require("./pkg.cjs.dev.js");
        }
        "#);
    }

    #[test]
    fn flow_entry() -> anyhow::Result<()> {
        let sources = Sources(vec![(
            "/repo/pkg/src/index.js",
            "// @flow\nexport default 1;",
        )]);
        let bundle: OutputBundle = [
            chunk("dist/pkg.cjs.dev.js", Some("/repo/pkg/src/index.js"), &["default"]),
            chunk("dist/pkg.cjs.prod.js", Some("/repo/pkg/src/index.js"), &["default"]),
        ]
        .into_iter()
        .collect();

        let assets = DualEntryEmitter.generate_bundle(&options(), &bundle, &sources)?;
        let names: Vec<_> = assets.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["dist/pkg.cjs.js.flow", "dist/pkg.cjs.js"]);
        assert_eq!(
            assets[0].source,
            "// @flow\nexport * from \"../src/index.js\";\nexport { default } from \"../src/index.js\";\n"
        );
        assert_eq!(assets[1].source, router("dist/pkg.cjs.js"));
        Ok(())
    }

    #[test]
    fn named_exports_only() {
        assert_eq!(
            flow_shim("../src/index.js", false),
            "// @flow\nexport * from \"../src/index.js\";\n"
        );
    }

    #[test]
    fn typescript_and_non_flow_sources_get_no_shim() -> anyhow::Result<()> {
        let sources = Sources(vec![("/repo/pkg/src/index.js", "export default 1;")]);
        let bundle: OutputBundle = [
            chunk("dist/pkg.cjs.prod.js", Some("/repo/pkg/src/index.js"), &[]),
            chunk("dist/other.cjs.prod.js", Some("/repo/pkg/src/other.ts"), &[]),
        ]
        .into_iter()
        .collect();

        let assets = DualEntryEmitter.generate_bundle(&options(), &bundle, &sources)?;
        let names: Vec<_> = assets.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["dist/pkg.cjs.js", "dist/other.cjs.js"]);
        Ok(())
    }

    #[test]
    fn skips_assets_and_facadeless_chunks() -> anyhow::Result<()> {
        let mut bundle: OutputBundle = [chunk("dist/shared.js", None, &[])].into_iter().collect();
        bundle.insert(
            "dist/style.css".into(),
            OutputFile::Asset(OutputAsset {
                file_name: "dist/style.css".into(),
                source: String::new(),
            }),
        );
        let assets = DualEntryEmitter.generate_bundle(&options(), &bundle, &Sources(vec![]))?;
        assert!(assets.is_empty());
        Ok(())
    }
}
