use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use medic_core::{Context, Healer};

/// Reboot every not-ready node and print the outcome
///
/// Per-node failures are reported, not returned. Only a failure to list the
/// cluster nodes makes the command fail.
pub async fn handle_heal_command(healer: &Healer, ctx: &Context, format: OutputFormat) -> Result<()> {
    let report = healer
        .heal(ctx)
        .await
        .context("failed to list NotReady nodes")?;

    output::print_report(&report, format)
}
