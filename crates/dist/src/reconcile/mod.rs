//! # Field Reconciliation
//!
//! Brings every entry point's manifest in line with the values computed by
//! [`crate::fields`], asking before each change.
//!
//! Fields are visited in a fixed order (`main`, `module`, `umd:main`, `browser`,
//! `exports`) and every question is asked at most once per package, covering all of the
//! package's entry points at once. Answers are obtained through the [`Confirm`]
//! collaborator, so the engine runs the same whether a terminal, a test or a
//! non-interactive caller is on the other end.
//!
//! Changes are staged in memory per manifest path and only written once a package has
//! been fully reconciled. A package which fails part way through writes nothing, and the
//! pass continues with the next package.
//!
//! ## Key Types
//!
//! - [`Confirm`] - answers yes/no questions.
//! - [`Question`] - every question the engine asks.
//! - [`Staged`] - the in-memory edits of one package.
//! - [`Outcome`] - what a reconciled package ended up as.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::fields;
use crate::manifest::{Field, FieldValue, Manifest};
use crate::project::{Entrypoint, ManifestStore, Package, Project};

mod validate;

pub use validate::{validate_package, validate_project};

//================================================================================================
// Types
//================================================================================================

/// A question put to the user before a manifest is changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    /// Overwrite or add the `main` field.
    WriteMainField,
    /// Add `module` fields, turning module builds on.
    WriteModuleField,
    /// Repair existing `module` fields.
    FixModuleField,
    /// Repair `umd:main` fields.
    FixUmdBuild,
    /// Repair `browser` fields.
    FixBrowserField,
    /// Repair the `exports` map.
    FixExportsField,
    /// Create a manifest for a nested entry point.
    CreateEntrypointManifest,
}

/// The collaborator answering questions.
///
/// At most one question is outstanding at a time.
#[allow(async_fn_in_trait)]
pub trait Confirm {
    /// Asks `question` on behalf of `package`.
    async fn confirm(&mut self, question: Question, package: &str) -> bool;
}

/// Answers every question with yes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Approve;

/// The reconciliation state of one field of one entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// Not looked at, because the field is not in use by the package.
    Unchecked,
    /// Holds its expected value.
    Valid,
    /// Absent.
    Missing,
    /// Present with an unexpected value.
    Invalid,
    /// Set to its expected value.
    Fixed,
    /// Left as is after the fix was declined.
    Declined,
}

/// The final state of one field of one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    /// The entry point name.
    pub entrypoint: String,
    /// The field.
    pub field: Field,
    /// Its final state.
    pub state: FieldState,
}

#[derive(Debug)]
struct StagedManifest {
    manifest: Manifest,
    dirty: bool,
}

/// The staged edits of one package, keyed by manifest path.
#[derive(Debug)]
pub struct Staged {
    package: String,
    manifests: IndexMap<PathBuf, StagedManifest>,
    reports: Vec<FieldReport>,
}

/// The result of reconciling one package.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The package name.
    pub package: String,
    /// The final state of every field of every entry point.
    pub reports: Vec<FieldReport>,
    /// The manifests written, in entry point order.
    pub written: Vec<PathBuf>,
}

//================================================================================================
// Impls
//================================================================================================

impl Question {
    /// The text shown to the user.
    pub fn prompt(self) -> &'static str {
        match self {
            Question::WriteMainField => {
                "distill is going to change the main field in your package.json, are you okay \
                 with that?"
            },
            Question::WriteModuleField => {
                "would you like to generate module builds? this will write to the module field \
                 in your package.json"
            },
            Question::FixModuleField => "would you like to fix the module field?",
            Question::FixUmdBuild => "would you like to fix the umd field?",
            Question::FixBrowserField => "would you like to fix the browser build?",
            Question::FixExportsField => "would you like to fix the exports field?",
            Question::CreateEntrypointManifest => {
                "A package.json file does not exist for this entrypoint, would you like to create \
                 one automatically?"
            },
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prompt())
    }
}

impl Confirm for Approve {
    async fn confirm(&mut self, question: Question, package: &str) -> bool {
        tracing::debug!(package, ?question, "approving without asking");
        true
    }
}

impl FieldState {
    fn of(expected: &FieldValue, actual: Option<&Value>) -> Self {
        match actual {
            None => FieldState::Missing,
            Some(v) if expected.matches(v) => FieldState::Valid,
            Some(_) => FieldState::Invalid,
        }
    }

    /// Whether the field needs no further attention.
    pub fn is_settled(self) -> bool {
        matches!(self, FieldState::Valid | FieldState::Fixed)
    }
}

impl Staged {
    fn new(package: &Package) -> Self {
        let mut manifests = IndexMap::new();
        manifests.insert(
            package.manifest_path(),
            StagedManifest {
                manifest: package.manifest().clone(),
                dirty: false,
            },
        );
        Self {
            package: package.name().to_owned(),
            manifests,
            reports: Vec::new(),
        }
    }

    fn stage_entrypoint(&mut self, entrypoint: &Entrypoint) {
        self.manifests
            .entry(entrypoint.manifest_path().to_owned())
            .or_insert_with(|| StagedManifest {
                manifest: entrypoint.manifest().clone(),
                dirty: !entrypoint.manifest_exists(),
            });
    }

    /// The staged manifest at `path`.
    pub fn manifest(&self, path: &Path) -> Option<&Manifest> {
        self.manifests.get(path).map(|s| &s.manifest)
    }

    fn field(&self, entrypoint: &Entrypoint, field: Field) -> Option<&Value> {
        self.manifest(entrypoint.manifest_path())?.get(field)
    }

    fn has_module(&self, entrypoint: &Entrypoint) -> bool {
        self.field(entrypoint, Field::Module).is_some()
    }

    fn set(&mut self, path: &Path, field: Field, value: &FieldValue) {
        if let Some(staged) = self.manifests.get_mut(path) {
            staged.manifest.set_field(field, value);
            staged.dirty = true;
        }
    }

    fn report(&mut self, entrypoint: &str, field: Field, state: FieldState) {
        self.reports.push(FieldReport {
            entrypoint: entrypoint.to_owned(),
            field,
            state,
        });
    }

    /// The state of every field visited so far.
    pub fn reports(&self) -> &[FieldReport] {
        &self.reports
    }

    /// Whether anything would be written.
    pub fn is_dirty(&self) -> bool {
        self.manifests.values().any(|s| s.dirty)
    }

    /// Writes every changed manifest through `store`.
    pub fn flush(self, store: &mut impl ManifestStore) -> Result<Outcome> {
        let mut written = Vec::new();
        for (path, staged) in self.manifests {
            if staged.dirty {
                store.write(&path, &staged.manifest)?;
                written.push(path);
            }
        }
        Ok(Outcome {
            package: self.package,
            reports: self.reports,
            written,
        })
    }
}

//================================================================================================
// Functions
//================================================================================================

/// Reconciles every package of `project`, writing approved changes through `store`.
///
/// A package which fails is skipped entirely; the remaining packages are still
/// reconciled and written. All failures are returned together at the end.
pub async fn reconcile_project<C, S>(
    project: &Project,
    confirm: &mut C,
    store: &mut S,
) -> Result<Vec<Outcome>>
where
    C: Confirm,
    S: ManifestStore,
{
    let mut outcomes = Vec::new();
    let mut errors = Vec::new();
    for package in project.packages() {
        let span = crate::log::package_span("reconciling", package.name());
        let result = reconcile_package(package, confirm)
            .instrument(span)
            .await
            .and_then(|staged| staged.flush(store));
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::warn!(package = %package.name(), "package left unchanged");
                errors.push(e);
            },
        }
    }
    Error::aggregate(errors)?;
    Ok(outcomes)
}

/// Reconciles one package in memory, returning the staged edits.
pub async fn reconcile_package<C: Confirm>(package: &Package, confirm: &mut C) -> Result<Staged> {
    let mut staged = Staged::new(package);
    let name = package.name();

    for entrypoint in package.entrypoints() {
        if !entrypoint.manifest_exists()
            && !confirm
                .confirm(Question::CreateEntrypointManifest, name)
                .await
        {
            return Err(Error::DeniedChange {
                message: "There is a missing package.json for an entrypoint".into(),
                package: name.to_owned(),
            });
        }
        staged.stage_entrypoint(entrypoint);
    }

    for field in Field::ALL {
        if field == Field::Exports {
            reconcile_exports(package, &mut staged, confirm).await?;
        } else {
            reconcile_field(package, field, &mut staged, confirm).await?;
        }
    }
    Ok(staged)
}

fn umd_name_missing(package: &str) -> Error {
    Error::Configuration {
        message: "the umd:main field is specified but a umdName option is not specified. please \
                  add it to the distill field in your package.json"
            .into(),
        name: package.to_owned(),
    }
}

/// The question to ask for `field`, given each entry point's current state.
///
/// Returns `None` when the field is not in use, or needs nothing.
fn question_for(field: Field, states: &[FieldState]) -> Option<Question> {
    let all_missing = states.iter().all(|s| *s == FieldState::Missing);
    if states.iter().all(|s| s.is_settled()) {
        return None;
    }
    match field {
        Field::Main => Some(Question::WriteMainField),
        Field::Module if all_missing => Some(Question::WriteModuleField),
        Field::Module => Some(Question::FixModuleField),
        Field::UmdMain if all_missing => None,
        Field::UmdMain => Some(Question::FixUmdBuild),
        Field::Browser if all_missing => None,
        Field::Browser => Some(Question::FixBrowserField),
        Field::Exports => Some(Question::FixExportsField),
    }
}

async fn reconcile_field<C: Confirm>(
    package: &Package,
    field: Field,
    staged: &mut Staged,
    confirm: &mut C,
) -> Result<()> {
    let name = package.name();
    let mut expected = Vec::with_capacity(package.entrypoints().len());
    for entrypoint in package.entrypoints() {
        let has_module = staged.has_module(entrypoint);
        let Some(value) = fields::expected(entrypoint, field, has_module) else {
            return Ok(());
        };
        let state = FieldState::of(&value, staged.field(entrypoint, field));
        expected.push((entrypoint, value, state));
    }
    let states: Vec<_> = expected.iter().map(|(_, _, s)| *s).collect();

    let in_use = !states.iter().all(|s| *s == FieldState::Missing);
    if field == Field::UmdMain && in_use && package.config().umd_name.is_none() {
        return Err(umd_name_missing(name));
    }

    let Some(question) = question_for(field, &states) else {
        if in_use || field.is_mandatory() {
            tracing::info!(package = %name, %field, "{} field is valid", field);
        }
        let state = if in_use || field.is_mandatory() {
            FieldState::Valid
        } else {
            FieldState::Unchecked
        };
        for (entrypoint, ..) in &expected {
            staged.report(entrypoint.name(), field, state);
        }
        return Ok(());
    };

    let approved = confirm.confirm(question, name).await;
    if !approved && field.is_mandatory() {
        return Err(Error::DeniedChange {
            message: "changing the main field is required to build".into(),
            package: name.to_owned(),
        });
    }
    // entry points of one package declare the same fields
    let partial = in_use && states.contains(&FieldState::Missing);
    if !approved && partial {
        return Err(Error::DeniedChange {
            message: format!(
                "all entrypoints in a package must have the same fields and one entrypoint in \
                 this package has a {} field but you've declined the fix",
                field
            ),
            package: name.to_owned(),
        });
    }
    for (entrypoint, value, state) in expected {
        let state = match state {
            FieldState::Valid => FieldState::Valid,
            _ if approved => {
                staged.set(entrypoint.manifest_path(), field, &value);
                FieldState::Fixed
            },
            _ => FieldState::Declined,
        };
        tracing::debug!(entrypoint = %entrypoint.name(), %field, ?state);
        staged.report(entrypoint.name(), field, state);
    }
    Ok(())
}

async fn reconcile_exports<C: Confirm>(
    package: &Package,
    staged: &mut Staged,
    confirm: &mut C,
) -> Result<()> {
    let name = package.name();
    let Some(value) = fields::exports::exports(package, |e| staged.has_module(e)) else {
        return Ok(());
    };
    let path = package.manifest_path();
    let actual = staged.manifest(&path).and_then(|m| m.get(Field::Exports));
    let state = FieldState::of(&value, actual);
    let state = match question_for(Field::Exports, &[state]) {
        None => {
            tracing::info!(package = %name, field = %Field::Exports, "exports field is valid");
            FieldState::Valid
        },
        Some(question) if confirm.confirm(question, name).await => {
            staged.set(&path, Field::Exports, &value);
            FieldState::Fixed
        },
        Some(_) => FieldState::Declined,
    };
    staged.report(name, Field::Exports, state);
    Ok(())
}
