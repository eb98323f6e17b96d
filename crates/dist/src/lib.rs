//! # Dist Crate
//!
//! The `dist` crate keeps the published entry-point metadata of multi-package
//! JavaScript source trees honest, and enforces module boundaries while they are
//! bundled.
//!
//! ## Key Concepts
//!
//! A **project** is the root of a source tree holding one or more **packages**. Every
//! package exposes one or more **entry points**, each a publicly importable sub-path
//! with its own `package.json` declaring where its builds live (`main`, `module`,
//! `umd:main`, `browser`, `exports`).
//!
//! The crate computes what those fields should be, compares them with what is declared,
//! and writes approved fixes back without disturbing anything else in the manifest.
//! During bundling it rejects imports escaping their package and emits a router file
//! which picks the development or production build at runtime.
//!
//! ## Architecture
//!
//! - [`manifest`] - the `package.json` model and the order-preserving field writer.
//! - [`project`] - projects, packages and entry points, and their on-disk discovery.
//! - [`fields`] - the expected value of every entry-point field, including `exports`.
//! - [`reconcile`] - the interactive reconciliation engine and check-only validation.
//! - [`bundle`] - bundler plugins for import boundaries and dual-mode entry files.
//! - [`error`] - error types and the diagnostics accumulator.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use dist::project::loader::{self, DiskStore};
//! use dist::reconcile::{self, Approve};
//!
//! # async fn run() -> dist::Result<()> {
//! let project = loader::load(std::path::Path::new("."))?;
//! reconcile::reconcile_project(&project, &mut Approve, &mut DiskStore).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub use self::error::{Diagnostics, Error, FatalError, Result};
pub use self::manifest::{Field, FieldValue, Manifest};
pub use self::project::{Entrypoint, Package, Project};

pub mod bundle;
pub mod error;
pub mod fields;
pub mod log;
pub mod manifest;
pub mod project;
pub mod reconcile;
