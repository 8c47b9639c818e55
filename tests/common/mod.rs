//! Shared fixtures for integration tests
//!
//! A wiremock server standing in for the file-service backend. Every
//! authenticated route requires `Authorization: Bearer <TOKEN>`.

#![allow(dead_code)]

use cloud_disk_e2e::client::ApiClient;
use cloud_disk_e2e::config::ApiConfig;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const SUFFIX: &str = "1700000000";

/// Matches requests without an `Authorization` header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

/// Matches requests whose raw body contains every given fragment
pub struct BodyContains(pub Vec<&'static str>);

impl Match for BodyContains {
    fn matches(&self, request: &Request) -> bool {
        let body = String::from_utf8_lossy(&request.body);
        self.0.iter().all(|fragment| body.contains(fragment))
    }
}

/// `{code: 0, msg: "success", data}` with HTTP 200
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "msg": "success", "data": data}))
}

/// Envelope carrying a non-zero code
pub fn rejected(status: u16, code: i64, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({"code": code, "msg": msg, "data": null}))
}

pub fn bearer() -> wiremock::matchers::HeaderExactMatcher {
    header("authorization", format!("Bearer {}", TOKEN).as_str())
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    let mut config = ApiConfig::new("secret");
    config.base_url = server.uri();
    config
}

pub fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_timeouts(&server.uri(), Duration::from_secs(5), Duration::from_secs(5))
        .expect("client")
}

pub fn upload_name() -> String {
    format!("e2e-{}.txt", SUFFIX)
}

pub fn renamed_name() -> String {
    format!("renamed-{}.txt", SUFFIX)
}

pub fn folder_name() -> String {
    format!("folder-{}", SUFFIX)
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .and(body_partial_json(json!({"name": "admin", "password": "secret"})))
        .respond_with(ok(json!({"token": TOKEN, "name": "admin"})))
        .expect(1)
        .mount(server)
        .await;
}

/// Unauthenticated listing is rejected
pub async fn mount_auth_gate(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/file/user/list"))
        .and(NoAuthorization)
        .respond_with(rejected(401, 401, "unauthorized"))
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_upload_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/file/upload"))
        .and(bearer())
        .and(BodyContains(vec![
            "name=\"file\"",
            "name=\"parent_id\"",
            "name=\"ParentId\"",
            "name=\"hash\"",
            "name=\"Hash\"",
            "name=\"object_key\"",
            "name=\"ObjectKey\"",
        ]))
        .respond_with(ok(json!({"identity": "f-1"})))
        .expect(1)
        .mount(server)
        .await;
}

/// Root listing as seen by the workflow (page 1, size 50)
pub async fn mount_root_listing(server: &MockServer, entries: Value) {
    Mock::given(method("POST"))
        .and(path("/api/file/user/list"))
        .and(bearer())
        .and(body_partial_json(json!({"id": 0, "page": 1, "size": 50})))
        .respond_with(ok(json!({"list": entries, "count": 1})))
        .expect(1)
        .mount(server)
        .await;
}

pub fn uploaded_entry() -> Value {
    json!({
        "id": 11,
        "identity": "f-1",
        "name": upload_name(),
        "ext": ".txt",
        "size": 15,
        "repository_identity": "r-1"
    })
}

/// Every step after locating the file, for a folder created without an id
pub async fn mount_remaining_steps(server: &MockServer, file_name: &str) {
    Mock::given(method("POST"))
        .and(path("/api/file/url"))
        .and(bearer())
        .and(body_partial_json(json!({"repository_identity": "r-1", "expires": 600})))
        .respond_with(ok(json!({"url": "https://oss.example.com/r-1?sig=abc", "expires": 600})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/file/user/file/name/update"))
        .and(bearer())
        .and(body_partial_json(json!({"identity": "f-1", "name": renamed_name()})))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/file/user/folder/create"))
        .and(bearer())
        .and(body_partial_json(json!({"parent_id": 0, "name": folder_name()})))
        .respond_with(ok(json!({"identity": "d-1"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/file/user/list"))
        .and(bearer())
        .and(body_partial_json(json!({"id": 0, "page": 1, "size": 100})))
        .respond_with(ok(json!({
            "list": [
                {"id": 11, "identity": "f-1", "name": file_name},
                {"id": 42, "identity": "d-1", "name": folder_name()}
            ],
            "count": 2
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/file/user/file/move"))
        .and(bearer())
        .and(body_partial_json(json!({
            "identity": "f-1",
            "parent_id": 42,
            "name": renamed_name()
        })))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(server)
        .await;

    mount_share_steps(server, "r-1").await;

    Mock::given(method("DELETE"))
        .and(path("/api/file/user/folder/delete"))
        .and(bearer())
        .and(body_partial_json(json!({"identity": "d-1"})))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(server)
        .await;
}

/// Share create/get/url/save; `reported` is what share get returns
pub async fn mount_share_steps(server: &MockServer, reported: &str) {
    mount_share_steps_saving(server, reported, ok(json!({"identity": "f-2"}))).await;
}

/// Share steps with a custom `/api/share/save` response
pub async fn mount_share_steps_saving(
    server: &MockServer,
    reported: &str,
    saved: ResponseTemplate,
) {
    Mock::given(method("POST"))
        .and(path("/api/share/create"))
        .and(bearer())
        .and(body_partial_json(json!({"identity": "r-1", "expired_time": 600})))
        .respond_with(ok(json!({"identity": "s-1"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/share/get"))
        .and(bearer())
        .and(query_param("identity", "s-1"))
        .respond_with(ok(json!({
            "repository_identity": reported,
            "name": "renamed",
            "ext": ".txt",
            "size": 15
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/share/url"))
        .and(bearer())
        .and(body_partial_json(json!({"share_identity": "s-1", "expires": 600})))
        .respond_with(ok(json!({"url": "https://oss.example.com/s-1?sig=def"})))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/share/save"))
        .and(bearer())
        .and(body_partial_json(json!({
            "repository_identity": "r-1",
            "parent_id": 0,
            "name": format!("saved-{}", renamed_name())
        })))
        .respond_with(saved)
        .mount(server)
        .await;
}
