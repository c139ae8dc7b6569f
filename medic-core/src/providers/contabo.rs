//! Contabo provider
//!
//! Reboots Contabo compute instances through the public REST API. The
//! access token and the full instance inventory are fetched at most once
//! per provider instance and shared by every reboot in the run.

use super::Provider;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::once::SingleFlight;
use async_trait::async_trait;
use medic_common::{Node, RemoteInstance};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Registry key for this provider
pub const PROVIDER_NAME: &str = "contabo";

pub const DEFAULT_AUTH_ENDPOINT: &str =
    "https://auth.contabo.com/auth/realms/contabo/protocol/openid-connect/token";
pub const DEFAULT_API_ENDPOINT: &str = "https://api.contabo.com/v1/";

/// Instances requested per inventory page
pub const PAGE_SIZE: u32 = 10;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Contabo account settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContaboConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_user: String,
    pub api_password: String,
    pub auth_endpoint: String,
    pub api_endpoint: String,
}

impl Default for ContaboConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_user: String::new(),
            api_password: String::new(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
        }
    }
}

impl std::fmt::Debug for ContaboConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContaboConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_user", &self.api_user)
            .field("api_password", &"<redacted>")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("api_endpoint", &self.api_endpoint)
            .finish()
    }
}

impl ContaboConfig {
    /// Check that every required setting is present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("api_user", &self.api_user),
            ("api_password", &self.api_password),
            ("auth_endpoint", &self.auth_endpoint),
            ("api_endpoint", &self.api_endpoint),
        ];

        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(Error::MissingConfig(*field)),
            None => Ok(()),
        }
    }
}

/// One page of `GET compute/instances`
#[derive(Debug, Deserialize)]
struct InstancePage {
    #[serde(default)]
    data: Vec<InstanceEntry>,
    #[serde(rename = "_links", default)]
    links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<String>,
}

impl PageLinks {
    /// An empty or missing `next` link marks the last page
    fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceEntry {
    instance_id: i64,
    #[serde(default)]
    ip_config: Option<IpConfig>,
}

#[derive(Debug, Deserialize)]
struct IpConfig {
    #[serde(default)]
    v4: Option<IpV4>,
}

#[derive(Debug, Deserialize)]
struct IpV4 {
    ip: String,
}

impl InstanceEntry {
    fn into_remote(self) -> Option<RemoteInstance> {
        let ip = self.ip_config?.v4?.ip;
        Some(RemoteInstance::new(self.instance_id, ip))
    }
}

/// Contabo REST client implementing the reboot capability
pub struct ContaboProvider {
    http: reqwest::Client,
    config: ContaboConfig,
    api_base: String,
    token: SingleFlight<String>,
    instances: SingleFlight<Vec<RemoteInstance>>,
}

impl ContaboProvider {
    /// Create a provider, failing when a required setting is missing
    pub fn new(config: ContaboConfig, http: reqwest::Client) -> Result<Self> {
        config.validate()?;

        let api_base = if config.api_endpoint.ends_with('/') {
            config.api_endpoint.clone()
        } else {
            format!("{}/", config.api_endpoint)
        };

        Ok(Self {
            http,
            config,
            api_base,
            token: SingleFlight::new(),
            instances: SingleFlight::new(),
        })
    }

    /// Get the access token, fetching it on first use
    pub async fn authenticate(&self, ctx: &Context) -> Result<&str> {
        self.token
            .get_or_fetch(|| self.fetch_token(ctx))
            .await
            .map(String::as_str)
    }

    /// Get the full instance inventory, fetching it on first use
    pub async fn list_inventory(&self, ctx: &Context, token: &str) -> Result<&[RemoteInstance]> {
        self.instances
            .get_or_fetch(|| self.fetch_inventory(ctx, token))
            .await
            .map(Vec::as_slice)
    }

    /// Find the inventory instance that owns one of the node's addresses
    pub async fn resolve_instance(
        &self,
        ctx: &Context,
        node: &Node,
        token: &str,
    ) -> Result<RemoteInstance> {
        let instances = self.list_inventory(ctx, token).await?;

        find_instance(instances, node)
            .cloned()
            .ok_or_else(|| Error::InstanceNotFound(node.name.clone()))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn fetch_token(&self, ctx: &Context) -> Result<String> {
        debug!(endpoint = %self.config.auth_endpoint, "Requesting Contabo access token");

        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.api_user.as_str()),
            ("password", self.config.api_password.as_str()),
            ("grant_type", "password"),
        ];

        let body = ctx
            .run(async {
                let response = self
                    .http
                    .post(&self.config.auth_endpoint)
                    .form(&form)
                    .send()
                    .await?;
                Ok::<_, Error>(response.text().await?)
            })
            .await
            .map_err(|e| match e {
                Error::DeadlineExceeded => e,
                other => Error::Authentication(other.to_string()),
            })?;

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Authentication(format!("invalid token response: {}", e)))?;

        match json.get("access_token").and_then(|token| token.as_str()) {
            Some(token) => {
                info!("Obtained Contabo access token");
                Ok(token.to_string())
            }
            None => Err(Error::Authentication(format!(
                "failed to get access_token body={}",
                body
            ))),
        }
    }

    async fn fetch_inventory(&self, ctx: &Context, token: &str) -> Result<Vec<RemoteInstance>> {
        let mut instances = Vec::new();
        let mut page = 1;

        loop {
            let (items, has_next) = self.fetch_page(ctx, token, page).await?;
            debug!(page, count = items.len(), has_next, "Fetched Contabo instance page");
            instances.extend(items);

            if !has_next {
                break;
            }
            page += 1;
        }

        info!(pages = page, instances = instances.len(), "Loaded Contabo inventory");
        Ok(instances)
    }

    async fn fetch_page(
        &self,
        ctx: &Context,
        token: &str,
        page: u32,
    ) -> Result<(Vec<RemoteInstance>, bool)> {
        let url = self.api_url("compute/instances");

        let (status, body) = ctx
            .run(async {
                let response = self
                    .http
                    .get(&url)
                    .query(&[("size", PAGE_SIZE), ("page", page)])
                    .header(CONTENT_TYPE, "application/json")
                    .bearer_auth(token)
                    .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string())
                    .send()
                    .await?;
                let status = response.status();
                Ok::<_, Error>((status, response.text().await?))
            })
            .await?;

        if !status.is_success() {
            return Err(Error::InvalidResponse(format!(
                "instance listing page {} failed status={} body={}",
                page,
                status.as_u16(),
                body
            )));
        }

        let parsed: InstancePage = serde_json::from_str(&body).map_err(|e| {
            Error::InvalidResponse(format!("instance listing page {}: {}", page, e))
        })?;

        let has_next = parsed.links.has_next();
        let items = parsed
            .data
            .into_iter()
            .filter_map(|entry| {
                let id = entry.instance_id;
                let remote = entry.into_remote();
                if remote.is_none() {
                    debug!(instance_id = id, "Skipping instance without IPv4 address");
                }
                remote
            })
            .collect();

        Ok((items, has_next))
    }

    async fn restart(&self, ctx: &Context, id: i64, token: &str) -> Result<()> {
        let url = self.api_url(&format!("compute/instances/{}/actions/restart", id));
        let request_id = Uuid::new_v4().to_string();

        let (status, body) = ctx
            .run(async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(token)
                    .header(REQUEST_ID_HEADER, &request_id)
                    .send()
                    .await?;
                let status = response.status();
                Ok::<_, Error>((status, response.text().await?))
            })
            .await?;

        if status != StatusCode::CREATED {
            return Err(Error::RemoteActionFailed {
                status: status.as_u16(),
                body,
            });
        }

        info!(instance_id = id, request_id = %request_id, "Restart action accepted");
        Ok(())
    }
}

#[async_trait]
impl Provider for ContaboProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn reboot(&self, ctx: &Context, node: &Node) -> Result<()> {
        let token = self.authenticate(ctx).await?;
        let instance = self.resolve_instance(ctx, node, token).await?;

        info!(
            node = %node.name,
            instance_id = instance.id,
            address = %instance.address,
            "Restarting Contabo instance"
        );

        self.restart(ctx, instance.id, token).await
    }
}

/// First instance, in inventory order, whose address the node reports
fn find_instance<'a>(instances: &'a [RemoteInstance], node: &Node) -> Option<&'a RemoteInstance> {
    instances.iter().find(|instance| node.has_address(&instance.address))
}
