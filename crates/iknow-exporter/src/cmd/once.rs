use std::io::Write;

use anyhow::Context;
use anyhow::Result;

use crate::app::builder::create_exporter;
use crate::app::builder::create_metrics;
use crate::config::ApiArgs;
use crate::exporter::UpdateStatus;

/// Run a single update and write the exposition to `out`
///
/// The exposition is written even when a source failed; the error is
/// returned afterwards so the exit status reflects the failure.
pub async fn run_once(api_args: ApiArgs, out: &mut impl Write) -> Result<()> {
    let metrics = create_metrics()?;
    let exporter = create_exporter(&api_args, metrics.clone())?;

    let report = exporter.update().await;

    let exposition = metrics
        .encode()
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {e:?}"))?;
    out.write_all(exposition.as_bytes())
        .context("write metrics exposition failed")?;
    out.flush().context("flush metrics exposition failed")?;

    match report.status() {
        UpdateStatus::Succeeded => Ok(()),
        status => Err(anyhow::anyhow!("iKnow stats update failed: {status}")),
    }
}
