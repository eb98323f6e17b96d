use std::path::Path;

pub(super) fn run(root: &Path) -> anyhow::Result<()> {
    let project = super::load(root)?;
    dist::reconcile::validate_project(&project).map_err(super::summarize)?;
    Ok(())
}
