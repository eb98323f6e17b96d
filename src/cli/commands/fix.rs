use std::path::Path;

use dist::reconcile::Approve;

pub(super) async fn run(root: &Path) -> anyhow::Result<()> {
    let project = super::load(root)?;
    let outcomes = super::reconcile(&project, &mut Approve).await?;
    let written: usize = outcomes.iter().map(|o| o.written.len()).sum();
    tracing::info!(project = %project.name(), manifests = written, "project fixed");
    Ok(())
}
