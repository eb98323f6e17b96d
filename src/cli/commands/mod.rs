mod fix;
mod init;
mod validate;

use std::path::Path;

use clap::Subcommand;
use dist::project::Project;
use dist::project::loader::{self, DiskStore};
use dist::reconcile::{self, Confirm, Outcome};

use super::Args;

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Set up the entry point fields of every package.
    ///
    /// For each package, this command compares the `main`, `module`,
    /// `umd:main`, `browser` and `exports` fields of every entry point
    /// with the values the build expects, and asks before fixing them:
    ///
    /// - `main` is required; declining the change aborts the package
    /// - other fields are optional; declining leaves them as they are
    /// - missing entry point `package.json` files are created on request
    #[command(verbatim_doc_comment)]
    Init(init::Args),
    /// Check that every entry point field is valid, changing nothing.
    ///
    /// Exits with an error listing every missing or invalid field.
    #[command(verbatim_doc_comment)]
    Validate,
    /// Fix every entry point field without asking.
    #[command(verbatim_doc_comment)]
    Fix,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let root = args.root()?;
    match args.command {
        Commands::Init(args) => init::run(&root, args).await,
        Commands::Validate => validate::run(&root),
        Commands::Fix => fix::run(&root).await,
    }
}

fn load(root: &Path) -> anyhow::Result<Project> {
    loader::load(root).map_err(summarize)
}

/// Reconciles `project`, writing changes to disk, and logs what was written.
async fn reconcile<C: Confirm>(project: &Project, confirm: &mut C) -> anyhow::Result<Vec<Outcome>> {
    let outcomes = reconcile::reconcile_project(project, confirm, &mut DiskStore)
        .await
        .map_err(summarize)?;
    for outcome in &outcomes {
        for path in &outcome.written {
            tracing::info!(package = %outcome.package, path = %path.display(), "updated manifest");
        }
    }
    Ok(outcomes)
}

/// Logs every problem in `error`, returning a one-line summary for the fatal report.
fn summarize(error: dist::Error) -> anyhow::Error {
    error.report();
    let count = match &error {
        dist::Error::Batch(items) => items.len(),
        dist::Error::Aborted(errors) => errors.len(),
        _ => 1,
    };
    anyhow::anyhow!("{} problem(s) found", count)
}
