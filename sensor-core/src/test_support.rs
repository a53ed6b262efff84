//! Mock HQ for client and manager tests

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HEALTH: &str = "/api/system/health";
pub const HEARTBEAT: &str = "/api/telemetry/heartbeat";
pub const ALERT: &str = "/api/telemetry/alert";
pub const STATS: &str = "/api/stats";

pub async fn mount_json(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// HQ that is healthy and hands out `policies` with a queued ISOLATE command
pub async fn healthy_hq_with(policies: Value) -> MockServer {
    let server = MockServer::start().await;

    mount_json(&server, "GET", HEALTH, 200, json!({ "status": "HEALTHY", "timestamp": "t", "db": "CONNECTED" })).await;
    mount_json(
        &server,
        "POST",
        HEARTBEAT,
        200,
        json!({
            "policies": policies,
            "policyVersion": "cafebabe",
            "commands": [{ "id": "c1", "type": "ISOLATE", "payload": {}, "queuedAt": 1 }]
        }),
    )
    .await;
    mount_json(&server, "GET", STATS, 200, json!({ "stats": { "totalAgents": 1 }, "chart": [], "discovery": {} })).await;
    mount_json(&server, "GET", ALERT, 200, json!([])).await;
    mount_json(&server, "POST", ALERT, 200, json!({ "success": true, "id": "a1" })).await;

    server
}

pub async fn healthy_hq() -> MockServer {
    healthy_hq_with(json!([
        { "id": "p1", "name": "JWT", "pattern": "eyJ", "action": "BLOCK", "description": "" }
    ]))
    .await
}

/// JSON bodies posted to `route`, oldest first
pub async fn bodies_sent_to(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route && r.method.as_str() == "POST")
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}
