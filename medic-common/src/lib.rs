//! Common types shared between medic-core and medic-cli

use serde::{Deserialize, Serialize};

/// Label on a cluster node naming the provider that owns the machine
pub const PROVIDER_LABEL: &str = "provider";

/// Cluster node as seen by the healer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Value of the `provider` label, empty when the label is missing
    pub provider_key: String,
    /// Reported node addresses in the order the cluster lists them
    pub addresses: Vec<String>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        provider_key: impl Into<String>,
        addresses: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_key: provider_key.into(),
            addresses,
        }
    }

    /// Check whether `address` is one of the node's reported addresses
    pub fn has_address(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a == address)
    }
}

/// Compute instance as listed by a provider inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInstance {
    pub id: i64,
    pub address: String,
}

impl RemoteInstance {
    pub fn new(id: i64, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
        }
    }
}
