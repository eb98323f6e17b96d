use std::path::Path;

use clap::Parser;

use crate::cli::prompt::Dialog;

#[derive(Parser, Debug)]
#[command(next_help_heading = "Init Options")]
#[group(id = "init_args")]
pub struct Args {
    /// Answer yes to every question
    ///
    /// note: the `prompt.assume_yes` setting has the same effect
    #[arg(long, short = 'y')]
    yes: bool,
}

pub(super) async fn run(root: &Path, args: Args) -> anyhow::Result<()> {
    let project = super::load(root)?;
    super::reconcile(&project, &mut Dialog::new(args.yes)).await?;
    tracing::info!(project = %project.name(), "initialised project!");
    Ok(())
}
