//! node-medic core library
//!
//! Heals a Kubernetes cluster by rebooting not-ready nodes through the
//! cloud provider that owns each machine:
//! - Provider registry keyed by the node `provider` label
//! - Contabo client with one-time authentication and inventory listing
//! - Address-based resolution of nodes to provider instances
//! - Healing orchestration over all not-ready nodes

pub mod cluster;
pub mod context;
pub mod error;
pub mod healer;
pub mod logging;
pub mod once;
pub mod providers;
pub mod registry;

pub use cluster::{KubeNodeSource, KubeSettings, NodeSource};
pub use context::Context;
pub use error::{Error, Result};
pub use healer::{HealFailure, HealReport, Healer};
pub use providers::Provider;
pub use registry::{ProviderRegistry, ProviderSettings};
