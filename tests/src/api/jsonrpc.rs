#![cfg(test)]
use std::time::Duration;

use addrbatch_common::config::{Credentials, ManagerConfig};
use addrbatch_core::api::jsonrpc::JsonRpcClient;
use addrbatch_core::api::{ApiError, ManagerApi};
use addrbatch_core::batch::{self, BatchExecutor, EpilogueStep};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{DOMAIN, TOKEN, records};

fn config(server: &MockServer, credentials: Credentials) -> ManagerConfig {
    ManagerConfig {
        host: server.uri(),
        domain: DOMAIN.to_string(),
        credentials,
        verify_tls: false,
        timeout: Duration::from_secs(5),
    }
}

fn password() -> Credentials {
    Credentials::Password {
        username: "admin".to_string(),
        password: "secret".to_string(),
    }
}

fn reply(url: &str, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "result": [{ "status": { "code": code, "message": message }, "url": url }],
    }))
}

fn call(method_name: &str, url: &str) -> Value {
    json!({ "method": method_name, "params": [{ "url": url }] })
}

async fn mount(server: &MockServer, body: Value, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(body))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn login_session_is_echoed_on_later_calls() {
    let server = MockServer::start().await;
    mount(
        &server,
        json!({
            "method": "exec",
            "params": [{ "url": "sys/login/user", "data": { "user": "admin", "passwd": "secret" } }],
        }),
        ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "result": [{ "status": { "code": 0, "message": "OK" }, "url": "sys/login/user" }],
            "session": "S3SS10N",
        })),
    )
    .await;
    mount(
        &server,
        json!({
            "session": "S3SS10N",
            "method": "exec",
            "params": [{ "url": "/dvmdb/adom/root/workspace/lock" }],
        }),
        reply("/dvmdb/adom/root/workspace/lock", 0, "OK"),
    )
    .await;

    let client = JsonRpcClient::new(&config(&server, password())).unwrap();

    assert!(client.login("admin", "secret").await.unwrap().is_success());
    assert!(client.lock(DOMAIN).await.unwrap().is_success());
}

#[tokio::test]
async fn token_is_sent_as_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(call("exec", "/dvmdb/adom/root/workspace/commit")))
        .respond_with(reply("/dvmdb/adom/root/workspace/commit", 0, "OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = JsonRpcClient::new(&config(&server, Credentials::Token(TOKEN.to_string()))).unwrap();
    client.attach_token(TOKEN);

    assert!(client.commit(DOMAIN).await.unwrap().is_success());
}

#[tokio::test]
async fn non_zero_status_is_a_response_not_an_error() {
    let server = MockServer::start().await;
    let url = "pm/config/adom/root/obj/firewall/address";
    mount(&server, call("set", url), reply(url, -2, "Object already exists")).await;

    let client = JsonRpcClient::new(&config(&server, password())).unwrap();
    let response = client.set(url, &json!({ "name": "h1" })).await.unwrap();

    assert_eq!(response.code, -2);
    assert_eq!(response.message, "Object already exists");
    assert!(!response.is_success());
}

#[tokio::test]
async fn unparseable_body_is_malformed() {
    let server = MockServer::start().await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/unlock"),
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let client = JsonRpcClient::new(&config(&server, password())).unwrap();
    let err = client.unlock(DOMAIN).await.unwrap_err();

    assert!(matches!(err, ApiError::Malformed { .. }), "{err}");
}

#[tokio::test]
async fn empty_result_list_is_malformed() {
    let server = MockServer::start().await;
    mount(
        &server,
        call("exec", "sys/logout"),
        ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "result": [] })),
    )
    .await;

    let client = JsonRpcClient::new(&config(&server, password())).unwrap();
    let err = client.logout().await.unwrap_err();

    assert!(matches!(err, ApiError::Malformed { .. }), "{err}");
}

#[tokio::test]
async fn http_error_status_is_a_transport_error() {
    let server = MockServer::start().await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/lock"),
        ResponseTemplate::new(503),
    )
    .await;

    let client = JsonRpcClient::new(&config(&server, password())).unwrap();
    let err = client.lock(DOMAIN).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport { .. }), "{err}");
    assert!(!err.to_string().contains("503"), "cause repeated in message: {err}");
    assert!(batch::describe(&err).contains("503"), "{}", batch::describe(&err));
}

#[tokio::test]
async fn constructor_does_not_attach_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(reply("/dvmdb/adom/root/workspace/lock", 0, "OK"))
        .expect(0)
        .mount(&server)
        .await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/lock"),
        reply("/dvmdb/adom/root/workspace/lock", 0, "OK"),
    )
    .await;

    let client = JsonRpcClient::new(&config(&server, Credentials::Token(TOKEN.to_string()))).unwrap();

    assert!(client.lock(DOMAIN).await.unwrap().is_success());
}

#[tokio::test]
async fn slow_manager_times_out() {
    let server = MockServer::start().await;
    let url = "pm/config/adom/root/obj/firewall/address";
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(reply(url, 0, "OK").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut cfg = config(&server, password());
    cfg.timeout = Duration::from_millis(200);
    let client = JsonRpcClient::new(&cfg).unwrap();
    let err = client.set(url, &json!({ "name": "h1" })).await.unwrap_err();

    assert!(matches!(err, ApiError::Timeout { .. }), "{err}");
}

#[tokio::test]
async fn full_password_run_over_http() {
    let server = MockServer::start().await;
    let address_url = "pm/config/adom/root/obj/firewall/address";

    mount(&server, call("exec", "sys/login/user"), reply("sys/login/user", 0, "OK")).await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/lock"),
        reply("/dvmdb/adom/root/workspace/lock", 0, "OK"),
    )
    .await;
    mount(
        &server,
        json!({
            "method": "set",
            "params": [{
                "url": address_url,
                "data": { "name": "h1", "type": "ipmask", "subnet": "10.0.0.0/24" },
            }],
        }),
        reply(address_url, 0, "OK"),
    )
    .await;
    mount(
        &server,
        json!({
            "method": "set",
            "params": [{ "url": address_url, "data": { "name": "h2", "subnet": "192.168.1.0/24" } }],
        }),
        reply(address_url, -2, "Object already exists"),
    )
    .await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/commit"),
        reply("/dvmdb/adom/root/workspace/commit", 0, "OK"),
    )
    .await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/unlock"),
        reply("/dvmdb/adom/root/workspace/unlock", 0, "OK"),
    )
    .await;
    mount(&server, call("exec", "sys/logout"), reply("sys/logout", 0, "OK")).await;

    let cfg = config(&server, password());
    let client = JsonRpcClient::new(&cfg).unwrap();
    let input = records(&[("h1", "10.0.0.9/24"), ("h2", "192.168.1.0/24")]);

    let report = BatchExecutor::new(&cfg).run(Box::new(client), &input).await.unwrap();

    assert!(report.outcomes[0].success);
    assert_eq!(report.outcomes[1].code, -2);
    assert!(report.epilogue_completed());
}

#[tokio::test]
async fn unreachable_commit_is_reported_and_unlock_still_sent() {
    let server = MockServer::start().await;
    let cfg = config(&server, Credentials::Token(TOKEN.to_string()));

    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/lock"),
        reply("/dvmdb/adom/root/workspace/lock", 0, "OK"),
    )
    .await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/commit"),
        ResponseTemplate::new(500),
    )
    .await;
    mount(
        &server,
        call("exec", "/dvmdb/adom/root/workspace/unlock"),
        reply("/dvmdb/adom/root/workspace/unlock", 0, "OK"),
    )
    .await;

    let client = JsonRpcClient::new(&cfg).unwrap();
    let report = BatchExecutor::new(&cfg).run(Box::new(client), &[]).await.unwrap();

    let steps: Vec<EpilogueStep> = report.epilogue_failures.iter().map(|f| f.step).collect();
    assert_eq!(steps, [EpilogueStep::Commit]);
}
