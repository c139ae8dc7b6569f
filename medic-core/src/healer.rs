//! Healing orchestration
//!
//! Pulls not-ready nodes from the cluster and reboots each one through the
//! provider registry. A failed reboot is logged as a warning and the run
//! moves on to the next node; only a failure to list nodes aborts the run.

use crate::cluster::NodeSource;
use crate::context::Context;
use crate::error::Result;
use crate::registry::ProviderRegistry;
use futures::stream::{self, StreamExt};
use medic_common::Node;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Reboot that failed during a heal run
#[derive(Debug, Clone, Serialize)]
pub struct HealFailure {
    pub node: String,
    pub error: String,
}

/// Outcome of a heal run
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealReport {
    pub rebooted: Vec<String>,
    pub failed: Vec<HealFailure>,
}

impl HealReport {
    /// True when every not-ready node was rebooted
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.rebooted.len() + self.failed.len()
    }
}

pub struct Healer {
    nodes: Arc<dyn NodeSource>,
    registry: Arc<ProviderRegistry>,
    concurrency: usize,
}

impl Healer {
    pub fn new(nodes: Arc<dyn NodeSource>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            nodes,
            registry,
            concurrency: 1,
        }
    }

    /// Reboot up to `concurrency` nodes at a time (minimum 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reboot every not-ready node
    pub async fn heal(&self, ctx: &Context) -> Result<HealReport> {
        info!("Checking NotReady nodes");

        let nodes = self.nodes.list_not_ready_nodes(ctx).await?;

        if nodes.is_empty() {
            info!("Nothing to heal");
            return Ok(HealReport::default());
        }

        let outcomes: Vec<(String, Result<()>)> = stream::iter(nodes)
            .map(|node| async move {
                let result = self.reboot(ctx, &node).await;
                (node.name, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = HealReport::default();
        for (name, result) in outcomes {
            match result {
                Ok(()) => report.rebooted.push(name),
                Err(e) => report.failed.push(HealFailure {
                    node: name,
                    error: e.to_string(),
                }),
            }
        }

        info!(
            rebooted = report.rebooted.len(),
            failed = report.failed.len(),
            "Heal run finished"
        );
        Ok(report)
    }

    /// Reboot a single node by name
    pub async fn reboot_node(&self, ctx: &Context, name: &str) -> Result<()> {
        info!(node = name, "Rebooting node");

        let node = self.nodes.get_node_by_name(ctx, name).await?;
        self.registry.dispatch_reboot(ctx, &node).await?;

        info!(node = name, "Done rebooting node");
        Ok(())
    }

    async fn reboot(&self, ctx: &Context, node: &Node) -> Result<()> {
        info!(node = %node.name, provider = %node.provider_key, "Node not ready, rebooting");

        match self.registry.dispatch_reboot(ctx, node).await {
            Ok(()) => {
                info!(node = %node.name, "Done rebooting node");
                Ok(())
            }
            Err(e) => {
                warn!(node = %node.name, error = %e, "Failed to heal node");
                Err(e)
            }
        }
    }
}
