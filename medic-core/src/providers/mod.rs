//! Cloud provider integrations
//!
//! Every provider exposes a single capability: reboot the machine behind a
//! cluster node. The registry dispatches to providers through this trait
//! and never looks at the concrete type.

pub mod contabo;
pub mod hetzner_robot;

use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use medic_common::Node;
use std::time::Duration;

pub use contabo::{ContaboConfig, ContaboProvider};
pub use hetzner_robot::HetznerRobotProvider;

/// Reboot capability implemented by each provider
///
/// Implementations must tolerate concurrent calls for different nodes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Reboot the machine backing `node`
    async fn reboot(&self, ctx: &Context, node: &Node) -> Result<()>;
}

/// Default timeout for a single provider HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by all providers
pub fn http_client(request_timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("node-medic/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
