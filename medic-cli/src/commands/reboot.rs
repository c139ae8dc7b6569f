use anyhow::{Context as _, Result};
use colored::Colorize;
use medic_core::{Context, Healer};

pub async fn handle_reboot_command(healer: &Healer, ctx: &Context, name: &str) -> Result<()> {
    healer
        .reboot_node(ctx, name)
        .await
        .with_context(|| format!("failed to reboot node {}", name))?;

    println!("{} Rebooted node {}", "✓".green(), name);
    Ok(())
}
