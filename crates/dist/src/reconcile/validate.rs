use serde_json::Value;

use super::{FieldReport, FieldState, umd_name_missing};
use crate::error::{DiagnosticKind, Diagnostics, Error, FatalError, Result};
use crate::fields;
use crate::manifest::{Field, FieldValue};
use crate::project::{Package, Project};

/// Describes a field which does not hold its expected value.
///
/// Nested entry points are named in the message; the package is named by the diagnostic.
fn invalid_field_message(
    field: Field,
    entrypoint: Option<&str>,
    found: Option<&Value>,
    expected: &FieldValue,
) -> String {
    let expected = Value::from(expected);
    let subject = match entrypoint {
        Some(entrypoint) => format!("{} field of {}", field, entrypoint),
        None => format!("{} field", field),
    };
    match found {
        None => format!("{} was not found, expected `{}`", subject, expected),
        Some(found) => format!(
            "{} is invalid, found `{}`, expected `{}`",
            subject, found, expected
        ),
    }
}

/// Checks every field of `package` without changing anything.
///
/// Fields other than `main` are only checked when some entry point declares them.
/// Every mismatch is pushed to `diagnostics`.
pub fn validate_package(
    package: &Package,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<FieldReport>> {
    let name = package.name();
    let mut reports = Vec::new();

    for field in Field::ALL {
        if field == Field::Exports {
            continue;
        }
        let in_use = field.is_mandatory()
            || package
                .entrypoints()
                .iter()
                .any(|e| e.manifest().contains(field));
        if !in_use {
            continue;
        }
        if field == Field::UmdMain && package.config().umd_name.is_none() {
            return Err(umd_name_missing(name));
        }

        let mut all_valid = true;
        for entrypoint in package.entrypoints() {
            let manifest = entrypoint.manifest();
            let has_module = manifest.contains(Field::Module);
            let Some(expected) = fields::expected(entrypoint, field, has_module) else {
                continue;
            };
            let found = manifest.get(field);
            let state = FieldState::of(&expected, found);
            if state != FieldState::Valid {
                all_valid = false;
                let nested = (!entrypoint.is_root()).then(|| entrypoint.name());
                diagnostics.push(FatalError::new(
                    DiagnosticKind::InvalidField,
                    invalid_field_message(field, nested, found, &expected),
                    name,
                ));
            }
            reports.push(FieldReport {
                entrypoint: entrypoint.name().to_owned(),
                field,
                state,
            });
        }
        if all_valid {
            tracing::info!(package = %name, %field, "{} field is valid", field);
        }
    }

    if let Some(expected) =
        fields::exports::exports(package, |e| e.manifest().contains(Field::Module))
    {
        let found = package.manifest().get(Field::Exports);
        let state = FieldState::of(&expected, found);
        if state == FieldState::Valid {
            tracing::info!(package = %name, field = %Field::Exports, "exports field is valid");
        } else {
            diagnostics.push(FatalError::new(
                DiagnosticKind::InvalidField,
                invalid_field_message(Field::Exports, None, found, &expected),
                name,
            ));
        }
        reports.push(FieldReport {
            entrypoint: name.to_owned(),
            field: Field::Exports,
            state,
        });
    }

    Ok(reports)
}

/// Checks every package of `project`, failing if any field is missing or invalid.
pub fn validate_project(project: &Project) -> Result<Vec<FieldReport>> {
    let mut diagnostics = Diagnostics::default();
    let mut errors = Vec::new();
    let mut reports = Vec::new();
    for package in project.packages() {
        let _span = crate::log::package_span("validating", package.name()).entered();
        match validate_package(package, &mut diagnostics) {
            Ok(r) => reports.extend(r),
            Err(e) => errors.push(e),
        }
    }
    if let Err(e) = diagnostics.finish() {
        errors.push(e);
    }
    Error::aggregate(errors)?;
    tracing::info!(project = %project.name(), "project is valid!");
    Ok(reports)
}
