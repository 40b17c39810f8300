#![allow(dead_code)]

use std::sync::{Arc, Once};

use ofleet_domain::OfleetConfig;
use ofleet_infra::{ApiClient, OfleetService};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "fleet-client";
pub const CLIENT_SECRET: &str = "fleet-secret";

static TRACING: Once = Once::new();

/// Install a test tracing subscriber (idempotent).
///
/// Output goes through the test writer, so it only shows for failing tests
/// or with `--nocapture`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("ofleet_infra=debug,ofleet_common=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Client configuration pointing at a mock server.
pub fn config_for(server: &MockServer) -> OfleetConfig {
    OfleetConfig::new(server.uri(), CLIENT_ID, CLIENT_SECRET)
}

/// API client using real OAuth against a mock server.
pub fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(config_for(server)).expect("api client should build")
}

/// Endpoint service using real OAuth against a mock server.
pub fn service_for(server: &MockServer) -> OfleetService {
    OfleetService::new(Arc::new(client_for(server)))
}

/// Token endpoint response body.
pub fn token_body(access: &str, refresh: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

/// Answer the client-credentials grant with `access`.
pub async fn mount_client_credentials(server: &MockServer, access: &str, refresh: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, refresh)))
        .mount(server)
        .await;
}

/// Answer the refresh-token grant with `access`.
pub async fn mount_refresh(server: &MockServer, access: &str, refresh: Option<&str>) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, refresh)))
        .mount(server)
        .await;
}

/// Mock server with a token endpoint issuing `test-access`.
pub async fn authorized_server() -> MockServer {
    init_test_tracing();
    let server = MockServer::start().await;
    mount_client_credentials(&server, "test-access", Some("test-refresh")).await;
    server
}
