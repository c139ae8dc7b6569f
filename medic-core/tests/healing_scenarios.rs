//! End-to-end healing scenarios against a mock provider API

use async_trait::async_trait;
use httpmock::prelude::*;
use medic_common::Node;
use medic_core::providers::{ContaboConfig, ContaboProvider};
use medic_core::{Context, Error, Healer, NodeSource, ProviderRegistry, Result};
use std::sync::Arc;
use std::time::Duration;

struct StaticNodes(Vec<Node>);

#[async_trait]
impl NodeSource for StaticNodes {
    async fn get_node_by_name(&self, _ctx: &Context, name: &str) -> Result<Node> {
        self.0
            .iter()
            .find(|n| n.name == name)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(name.to_string()))
    }

    async fn list_not_ready_nodes(&self, _ctx: &Context) -> Result<Vec<Node>> {
        Ok(self.0.clone())
    }
}

fn contabo(server: &MockServer) -> ContaboProvider {
    let config = ContaboConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        api_user: "ops@example.com".to_string(),
        api_password: "hunter2".to_string(),
        auth_endpoint: server.url("/auth/token"),
        api_endpoint: server.url("/v1/"),
    };
    ContaboProvider::new(config, reqwest::Client::new()).unwrap()
}

fn acme_registry(server: &MockServer) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register("acme", Arc::new(contabo(server)));
    registry
}

fn inventory(entries: &[(i64, &str)]) -> String {
    let data: Vec<serde_json::Value> = entries
        .iter()
        .map(|(id, ip)| serde_json::json!({ "instanceId": id, "ipConfig": { "v4": { "ip": ip } } }))
        .collect();
    serde_json::json!({ "data": data, "_links": { "next": "" } }).to_string()
}

fn ctx() -> Context {
    Context::with_timeout(Duration::from_secs(10))
}

fn n1() -> Node {
    Node::new("n1", "acme", vec!["10.0.0.5".to_string()])
}

#[tokio::test]
async fn reboot_restarts_instance_matching_node_address() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(200).body(r#"{"access_token":"tok-a"}"#);
    });
    let _instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(7, "10.0.0.7"), (42, "10.0.0.5")]));
    });
    let restart = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/compute/instances/42/actions/restart")
            .header("authorization", "Bearer tok-a");
        then.status(201);
    });

    let registry = acme_registry(&server);
    registry.dispatch_reboot(&ctx(), &n1()).await.unwrap();

    auth.assert();
    restart.assert();
}

#[tokio::test]
async fn reboot_without_inventory_match_makes_no_restart_call() {
    let server = MockServer::start();
    let _auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(200).body(r#"{"access_token":"tok-b"}"#);
    });
    let _instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(7, "10.0.0.7")]));
    });
    let restart = server.mock(|when, then| {
        when.method(POST).path("/v1/compute/instances/7/actions/restart");
        then.status(201);
    });

    let registry = acme_registry(&server);
    let err = registry.dispatch_reboot(&ctx(), &n1()).await.unwrap_err();

    assert!(matches!(err, Error::InstanceNotFound(name) if name == "n1"));
    restart.assert_calls(0);
}

#[tokio::test]
async fn authentication_failure_is_replayed_without_a_second_call() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(401).body(r#"{"error":"invalid_client"}"#);
    });
    let instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(42, "10.0.0.5")]));
    });

    let provider = contabo(&server);
    let first = provider.authenticate(&ctx()).await.unwrap_err();
    let second = provider.authenticate(&ctx()).await.unwrap_err();

    assert!(matches!(first, Error::Authentication(_)));
    assert_eq!(first.to_string(), second.to_string());
    auth.assert();
    instances.assert_calls(0);
}

#[tokio::test]
async fn heal_continues_past_node_with_unknown_provider() {
    let server = MockServer::start();
    let _auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(200).body(r#"{"access_token":"tok-d"}"#);
    });
    let _instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(42, "10.0.0.5")]));
    });
    let restart = server.mock(|when, then| {
        when.method(POST).path("/v1/compute/instances/42/actions/restart");
        then.status(201);
    });

    let nodes = vec![
        n1(),
        Node::new("n2", "unregistered", vec!["10.0.0.6".to_string()]),
    ];
    let healer = Healer::new(Arc::new(StaticNodes(nodes)), Arc::new(acme_registry(&server)));

    let report = healer.heal(&ctx()).await.unwrap();

    assert_eq!(report.rebooted, vec!["n1".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].node, "n2");
    restart.assert();
}

#[tokio::test]
async fn unknown_provider_makes_no_network_call() {
    let server = MockServer::start();
    let auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(200).body(r#"{"access_token":"tok-f"}"#);
    });
    let instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(42, "10.0.0.5")]));
    });

    let registry = acme_registry(&server);
    let node = Node::new("n1", "ACME", vec!["10.0.0.5".to_string()]);
    let err = registry.dispatch_reboot(&ctx(), &node).await.unwrap_err();

    assert!(matches!(err, Error::ProviderNotFound(key) if key == "ACME"));
    auth.assert_calls(0);
    instances.assert_calls(0);
}

#[tokio::test]
async fn reboot_node_by_name_is_fatal_on_failure() {
    let server = MockServer::start();
    let _auth = server.mock(|when, then| {
        when.method(POST).path("/auth/token");
        then.status(200).body(r#"{"access_token":"tok-e"}"#);
    });
    let _instances = server.mock(|when, then| {
        when.method(GET).path("/v1/compute/instances");
        then.status(200).body(inventory(&[(42, "10.0.0.5")]));
    });
    let _restart = server.mock(|when, then| {
        when.method(POST).path("/v1/compute/instances/42/actions/restart");
        then.status(409).body("instance is locked");
    });

    let healer = Healer::new(
        Arc::new(StaticNodes(vec![n1()])),
        Arc::new(acme_registry(&server)),
    );

    let err = healer.reboot_node(&ctx(), "n1").await.unwrap_err();
    assert!(matches!(err, Error::RemoteActionFailed { status: 409, .. }));

    let missing = healer.reboot_node(&ctx(), "n9").await.unwrap_err();
    assert!(matches!(missing, Error::NodeNotFound(_)));
}
