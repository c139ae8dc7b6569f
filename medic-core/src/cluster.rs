//! Cluster node source
//!
//! Reads nodes from the Kubernetes API and converts them into healer
//! `Node` values. The kube client is created on first use, from the local
//! kubeconfig when one exists and from the in-cluster service account
//! otherwise.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::once::SingleFlight;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node as K8sNode;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use medic_common::{Node, PROVIDER_LABEL};
use std::path::PathBuf;
use tracing::{debug, info};

/// Server-side timeout for the node listing, in seconds
const LIST_TIMEOUT_SECS: u32 = 5;

/// Source of cluster nodes for the healer
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Fetch one node, failing with `NodeNotFound` when it does not exist
    async fn get_node_by_name(&self, ctx: &Context, name: &str) -> Result<Node>;

    /// List nodes whose Ready condition is False or Unknown
    async fn list_not_ready_nodes(&self, ctx: &Context) -> Result<Vec<Node>>;
}

/// How to reach the cluster API
#[derive(Debug, Clone, Default)]
pub struct KubeSettings {
    /// Explicit kubeconfig path, otherwise `$HOME/.kube/config` if present
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context, otherwise the current context
    pub context: Option<String>,
}

/// `NodeSource` backed by the Kubernetes API
pub struct KubeNodeSource {
    settings: KubeSettings,
    client: SingleFlight<Client>,
}

impl KubeNodeSource {
    pub fn new(settings: KubeSettings) -> Self {
        Self {
            settings,
            client: SingleFlight::new(),
        }
    }

    async fn nodes_api(&self, ctx: &Context) -> Result<Api<K8sNode>> {
        let client = self
            .client
            .get_or_fetch(|| ctx.run(connect(&self.settings)))
            .await?;
        Ok(Api::all(client.clone()))
    }
}

#[async_trait]
impl NodeSource for KubeNodeSource {
    async fn get_node_by_name(&self, ctx: &Context, name: &str) -> Result<Node> {
        let api = self.nodes_api(ctx).await?;

        let node = ctx
            .run(async {
                api.get_opt(name)
                    .await
                    .map_err(|e| Error::Cluster(format!("failed to get node: {}", e)))
            })
            .await?;

        node.as_ref()
            .map(to_node)
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))
    }

    async fn list_not_ready_nodes(&self, ctx: &Context) -> Result<Vec<Node>> {
        let api = self.nodes_api(ctx).await?;
        let params = ListParams::default().timeout(LIST_TIMEOUT_SECS);

        let list = ctx
            .run(async {
                api.list(&params)
                    .await
                    .map_err(|e| Error::Cluster(format!("failed to get nodes: {}", e)))
            })
            .await?;

        debug!(total = list.items.len(), "Listed cluster nodes");
        Ok(list
            .items
            .iter()
            .filter(|node| is_not_ready(node))
            .map(to_node)
            .collect())
    }
}

async fn connect(settings: &KubeSettings) -> Result<Client> {
    let config = match local_kubeconfig(settings) {
        Some(path) => {
            info!(kubeconfig = %path.display(), "Loading config from file (local mode)");
            let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
                Error::Cluster(format!("failed to read {}: {}", path.display(), e))
            })?;
            let options = KubeConfigOptions {
                context: settings.context.clone(),
                ..Default::default()
            };
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::Cluster(format!("failed to make config: {}", e)))?
        }
        None => {
            info!("Loading config from cluster (cluster mode)");
            Config::incluster()
                .map_err(|e| Error::Cluster(format!("failed to make config: {}", e)))?
        }
    };

    Client::try_from(config).map_err(|e| Error::Cluster(format!("failed to create client: {}", e)))
}

fn local_kubeconfig(settings: &KubeSettings) -> Option<PathBuf> {
    if let Some(path) = &settings.kubeconfig {
        return Some(path.clone());
    }

    let home = std::env::var_os("HOME")?;
    let path = PathBuf::from(home).join(".kube").join("config");
    path.exists().then_some(path)
}

/// Convert a Kubernetes node into a healer node
pub fn to_node(node: &K8sNode) -> Node {
    let name = node.metadata.name.clone().unwrap_or_default();

    let provider_key = node
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(PROVIDER_LABEL))
        .cloned()
        .unwrap_or_default();

    let addresses = node
        .status
        .as_ref()
        .and_then(|status| status.addresses.as_ref())
        .map(|addresses| addresses.iter().map(|a| a.address.clone()).collect())
        .unwrap_or_default();

    Node {
        name,
        provider_key,
        addresses,
    }
}

/// A node is not ready when its Ready condition is anything but True
pub fn is_not_ready(node: &K8sNode) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status != "True")
        })
        .unwrap_or(false)
}
