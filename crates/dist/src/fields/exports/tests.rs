use serde_json::{Value, json};

use super::*;
use crate::manifest::Manifest;
use crate::project::Project;

fn package(exports: Value, flag: bool, sources: &[&str]) -> anyhow::Result<Package> {
    let config = serde_json::from_value(json!({ "experimentalFlags": { "exports": flag } }))?;
    let project = Project::new("repo", "/repo", config)?;
    let manifest = Manifest::try_from(json!({ "name": "pkg", "distill": { "exports": exports } }))?;
    let mut pkg = Package::new(&project, "/repo", manifest)?;
    for source in sources {
        pkg.add_entrypoint(source, None)?;
    }
    Ok(pkg)
}

fn render(value: Option<FieldValue>) -> anyhow::Result<String> {
    let value = value.ok_or_else(|| anyhow::anyhow!("no exports map"))?;
    Ok(serde_json::to_string_pretty(&Value::from(&value))?)
}

fn keys(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::Conditions(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

#[test]
fn default_conditions() -> anyhow::Result<()> {
    let pkg = package(json!(true), true, &["src/index.js", "src/one.js"])?;
    let out = render(exports(&pkg, |e| e.is_root()))?;
    insta::assert_snapshot!(out, @r#"
    {
      "./package.json": "./package.json",
      ".": {
        "browser": {
          "production": {
            "module": "./dist/pkg.browser.esm.prod.js",
            "default": "./dist/pkg.browser.cjs.prod.js"
          },
          "module": "./dist/pkg.browser.esm.dev.js",
          "default": "./dist/pkg.browser.cjs.js"
        },
        "production": {
          "module": "./dist/pkg.esm.prod.js",
          "default": "./dist/pkg.cjs.prod.js"
        },
        "module": "./dist/pkg.esm.dev.js",
        "default": "./dist/pkg.cjs.js"
      },
      "./one": {
        "browser": {
          "production": {
            "default": "./one/dist/pkg-one.browser.cjs.prod.js"
          },
          "default": "./one/dist/pkg-one.browser.cjs.js"
        },
        "production": {
          "default": "./one/dist/pkg-one.cjs.prod.js"
        },
        "default": "./one/dist/pkg-one.cjs.js"
      }
    }
    "#);
    Ok(())
}

#[test]
fn disabled_without_flag_or_option() -> anyhow::Result<()> {
    let pkg = package(json!(true), false, &["src/index.js"])?;
    assert_eq!(exports(&pkg, |_| true), None);

    let pkg = package(json!(false), true, &["src/index.js"])?;
    assert_eq!(exports(&pkg, |_| true), None);
    Ok(())
}

#[test]
fn worker_precedes_browser() -> anyhow::Result<()> {
    let pkg = package(
        json!({ "conditions": ["worker", "browser", "module"] }),
        true,
        &["src/index.js"],
    )?;
    let value = exports(&pkg, |_| true).ok_or_else(|| anyhow::anyhow!("no exports map"))?;
    let FieldValue::Conditions(map) = &value else {
        anyhow::bail!("exports is a conditions map");
    };
    let Some(Conditions::Nested(root)) = map.get(".") else {
        anyhow::bail!("root entry is nested");
    };
    let root_keys: Vec<_> = root.keys().map(String::as_str).collect();
    assert_eq!(
        root_keys,
        ["worker", "browser", "production", "module", "default"]
    );
    Ok(())
}

#[test]
fn module_condition_needs_a_module_build() -> anyhow::Result<()> {
    let pkg = package(json!({ "conditions": [] }), true, &["src/index.js"])?;
    let out = render(exports(&pkg, |_| true))?;
    insta::assert_snapshot!(out, @r#"
    {
      "./package.json": "./package.json",
      ".": {
        "production": {
          "default": "./dist/pkg.cjs.prod.js"
        },
        "default": "./dist/pkg.cjs.js"
      }
    }
    "#);
    Ok(())
}

#[test]
fn extra_is_merged_last() -> anyhow::Result<()> {
    let pkg = package(
        json!({
            "conditions": [],
            "extra": {
                "./package.json": "./elsewhere.json",
                "./extra": "./extra.js",
                ".": "./override.js"
            }
        }),
        true,
        &["src/index.js"],
    )?;
    let value = exports(&pkg, |_| false).ok_or_else(|| anyhow::anyhow!("no exports map"))?;
    assert_eq!(keys(&value), ["./package.json", ".", "./extra"]);
    assert_eq!(
        Value::from(&value),
        json!({
            "./package.json": "./package.json",
            ".": "./override.js",
            "./extra": "./extra.js"
        })
    );
    Ok(())
}

#[test]
fn deterministic() -> anyhow::Result<()> {
    let pkg = package(json!(true), true, &["src/index.js", "src/a/b.js"])?;
    assert_eq!(
        render(exports(&pkg, |_| true))?,
        render(exports(&pkg, |_| true))?
    );
    let value = exports(&pkg, |_| true).ok_or_else(|| anyhow::anyhow!("no exports map"))?;
    assert_eq!(keys(&value), ["./package.json", ".", "./a/b"]);
    Ok(())
}
