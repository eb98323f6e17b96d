//! # Errors and Diagnostics
//!
//! Every failure in this crate is a deterministic function of configuration and
//! source-tree state, so nothing here carries retry state. Failures come in two
//! shapes:
//!
//! - [`Error`]: returned through `Result` and aborting the current package at once
//!   (bad configuration, missing sources, denied mandatory changes, unresolvable
//!   relative imports).
//! - [`FatalError`]: a diagnostic pushed into a [`Diagnostics`] accumulator so a single
//!   pass can surface every boundary violation and missing dependency in a tree before
//!   the build gives up.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

//================================================================================================
// Types
//================================================================================================

/// A specialized result type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error which aborts the current package (or the whole project, for configuration).
#[derive(Error, Debug)]
pub enum Error {
    /// The project or package configuration is invalid.
    #[error("{message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
        /// The project or package the configuration belongs to.
        name: String,
    },
    /// No source file exists where an entry point expects one.
    #[error(
        "no source file was provided, please create a file at {source_path} or specify a custom \
         entrypoint with the `distill.entrypoints` option"
    )]
    MissingSource {
        /// The expected source path, relative to the package directory.
        source_path: String,
        /// The package declaring the entry point.
        package: String,
    },
    /// The user declined a change the build cannot do without.
    #[error("{message}")]
    DeniedChange {
        /// Which change was declined.
        message: String,
        /// The package the change was proposed for.
        package: String,
    },
    /// A relative import could not be resolved at all.
    #[error("{message}")]
    UnresolvableImport {
        /// A description of the import that failed.
        message: String,
        /// The package being bundled.
        package: String,
    },
    /// A package declares no entry points.
    #[error("packages must have at least one entrypoint, this package has no entrypoints")]
    NoEntrypoints {
        /// The offending package.
        package: String,
    },
    /// Two entry points in the project share a name.
    #[error("the entrypoint `{0}` is declared more than once")]
    DuplicateEntrypoint(String),
    /// One or more fatal diagnostics were collected during a pass.
    #[error("{} problem(s) found", .0.len())]
    Batch(Vec<FatalError>),
    /// More than one package failed during a pass.
    #[error("{} package(s) failed", .0.len())]
    Aborted(Vec<Error>),
    /// A manifest is not a JSON object, or not valid JSON.
    #[error("invalid manifest at {}: {source}", path.display())]
    Json {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
        /// The manifest path.
        path: PathBuf,
    },
    /// A glob in the configuration is malformed.
    #[error(transparent)]
    Glob(#[from] globset::Error),
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A manifest could not be persisted over the original.
    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
    /// A directory walk failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Distinguishes diagnostics which fail the build from those which only warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An import escapes its package directory. Fatal once diagnostics are aggregated.
    BoundaryViolation,
    /// A bare specifier could not be resolved; the build continues with a stub.
    MissingDependency,
    /// A manifest field does not hold its expected value.
    InvalidField,
}

/// A diagnostic message attributed to the package it was raised in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    /// What went wrong.
    pub message: String,
    /// The package the diagnostic belongs to.
    pub package_name: String,
    /// The kind of problem.
    pub kind: DiagnosticKind,
}

/// An accumulator for diagnostics raised across every package in one build pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<FatalError>,
}

//================================================================================================
// Impls
//================================================================================================

impl Error {
    /// The package or project this error is attributed to, if any.
    pub fn package_name(&self) -> Option<&str> {
        match self {
            Error::Configuration { name, .. } => Some(name),
            Error::MissingSource { package, .. }
            | Error::DeniedChange { package, .. }
            | Error::UnresolvableImport { package, .. }
            | Error::NoEntrypoints { package } => Some(package),
            _ => None,
        }
    }

    /// Report this error through `tracing`, one event per underlying problem.
    pub fn report(&self) {
        match self {
            Error::Batch(items) => {
                for item in items {
                    tracing::error!(package = %item.package_name, "{}", item.message);
                }
            },
            Error::Aborted(errors) => errors.iter().for_each(Error::report),
            _ => match self.package_name() {
                Some(package) => tracing::error!(package, "{}", self),
                None => tracing::error!("{}", self),
            },
        }
    }

    /// Folds the errors of a pass into one: a single error is returned as is.
    pub fn aggregate(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Aborted(errors)),
        }
    }
}

impl DiagnosticKind {
    /// Whether diagnostics of this kind fail the build once aggregated.
    pub fn is_fatal(self) -> bool {
        !matches!(self, DiagnosticKind::MissingDependency)
    }
}

impl FatalError {
    /// Creates a new diagnostic for the given package.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, package_name: &str) -> Self {
        Self {
            message: message.into(),
            package_name: package_name.to_owned(),
            kind,
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package_name, self.message)
    }
}

impl Diagnostics {
    /// Records a diagnostic.
    pub fn push(&mut self, diagnostic: FatalError) {
        tracing::debug!(
            package = %diagnostic.package_name,
            kind = ?diagnostic.kind,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All diagnostics recorded so far, in the order they were raised.
    pub fn items(&self) -> &[FatalError] {
        &self.items
    }

    /// Ends the pass: warnings are logged, and every fatal diagnostic is returned together.
    pub fn finish(self) -> Result<()> {
        let (fatal, warnings): (Vec<_>, Vec<_>) =
            self.items.into_iter().partition(|d| d.kind.is_fatal());
        for warning in &warnings {
            tracing::warn!(package = %warning.package_name, "{}", warning.message);
        }
        if fatal.is_empty() {
            Ok(())
        } else {
            Err(Error::Batch(fatal))
        }
    }
}

impl Extend<FatalError> for Diagnostics {
    fn extend<T: IntoIterator<Item = FatalError>>(&mut self, iter: T) {
        for item in iter {
            self.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(package: &str) -> Error {
        Error::DeniedChange {
            message: "changing the main field is required to build".into(),
            package: package.into(),
        }
    }

    #[test]
    fn aggregate_keeps_single_errors() {
        assert!(Error::aggregate(vec![]).is_ok());
        let single = Error::aggregate(vec![denied("a")]).unwrap_err();
        assert_eq!(single.package_name(), Some("a"));
        let many = Error::aggregate(vec![denied("a"), denied("b")]).unwrap_err();
        assert_eq!(many.to_string(), "2 package(s) failed");
    }

    #[test]
    fn warnings_do_not_fail_the_pass() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(FatalError::new(
            DiagnosticKind::MissingDependency,
            "\"lodash\" is imported",
            "pkg",
        ));
        assert!(diagnostics.finish().is_ok());
    }

    #[test]
    fn fatal_diagnostics_are_batched() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.extend([
            FatalError::new(DiagnosticKind::BoundaryViolation, "one", "a"),
            FatalError::new(DiagnosticKind::MissingDependency, "two", "a"),
            FatalError::new(DiagnosticKind::InvalidField, "three", "b"),
        ]);
        let Err(Error::Batch(items)) = diagnostics.finish() else {
            panic!("expected a batch");
        };
        let messages: Vec<_> = items.iter().map(ToString::to_string).collect();
        assert_eq!(messages, ["a one", "b three"]);
    }
}
