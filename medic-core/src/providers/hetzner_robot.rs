//! Hetzner Robot provider (placeholder)

use super::Provider;
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use medic_common::Node;
use tracing::warn;

/// Registry key for this provider
pub const PROVIDER_NAME: &str = "hetzner_robot";

/// Accepts reboot requests for Hetzner Robot servers without acting on them
#[derive(Debug, Clone, Default)]
pub struct HetznerRobotProvider;

impl HetznerRobotProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Provider for HetznerRobotProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn reboot(&self, _ctx: &Context, node: &Node) -> Result<()> {
        warn!(
            node = %node.name,
            provider = PROVIDER_NAME,
            "Reboot not implemented for provider, skipping"
        );
        Ok(())
    }
}
