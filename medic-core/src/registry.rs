//! Provider registry
//!
//! Maps the `provider` label of a node to the integration that owns the
//! machine. The registry is built once at startup and only read afterwards,
//! so it is shared through an `Arc` without locking.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::providers::{
    contabo, hetzner_robot, ContaboConfig, ContaboProvider, HetznerRobotProvider, Provider,
};
use medic_common::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Settings for every provider the registry knows how to build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub contabo: ContaboConfig,
    /// Register the Hetzner Robot placeholder
    #[serde(default = "default_true")]
    pub hetzner_robot: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            contabo: ContaboConfig::default(),
            hetzner_robot: true,
        }
    }
}

/// Provider lookup by registry key
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from settings, skipping unconfigured providers
    pub fn from_settings(settings: &ProviderSettings, http: reqwest::Client) -> Self {
        let mut registry = Self::new();

        match ContaboProvider::new(settings.contabo.clone(), http) {
            Ok(provider) => registry.register(contabo::PROVIDER_NAME, Arc::new(provider)),
            Err(e) => info!(
                provider = contabo::PROVIDER_NAME,
                reason = %e,
                "Provider not configured, skipping"
            ),
        }

        if settings.hetzner_robot {
            registry.register(
                hetzner_robot::PROVIDER_NAME,
                Arc::new(HetznerRobotProvider::new()),
            );
        }

        info!(providers = ?registry.names(), "Loaded providers");
        registry
    }

    /// Register a provider, replacing any provider already under `name`
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        let name = name.into();
        debug!(name = %name, provider = provider.name(), "Registering provider");
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered keys in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Forward a reboot to the provider named by the node's label
    pub async fn dispatch_reboot(&self, ctx: &Context, node: &Node) -> Result<()> {
        let provider = self
            .get(&node.provider_key)
            .ok_or_else(|| Error::ProviderNotFound(node.provider_key.clone()))?;

        debug!(node = %node.name, provider = provider.name(), "Dispatching reboot");
        provider.reboot(ctx, node).await
    }
}
