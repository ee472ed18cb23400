//! Integration tests for the reqwest transport against a loopback server

use jolpica_f1_client::client::transport::{build_http_client, ReqwestTransport, Transport};
use jolpica_f1_client::{ClientConfig, ClientError, JolpicaClient};
use serde_json::json;
use std::net::TcpListener;
use std::time::Duration;

use crate::support::stub_server::*;

#[tokio::test]
async fn test_reports_status_header_and_body() {
    let server = StubServer::start(vec![http_response(
        429,
        &[("Retry-After", "7")],
        r#"{"detail": "slow down"}"#,
    )]);
    let transport = ReqwestTransport::with_default_timeouts().unwrap();

    let response = transport
        .get(
            &format!("{}/2024/5/laps", server.base_url()),
            &[("limit".to_string(), "1".to_string())],
        )
        .await
        .unwrap();

    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after.as_deref(), Some("7"));
    assert_eq!(response.body, r#"{"detail": "slow down"}"#);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /2024/5/laps?limit=1 "));
}

#[tokio::test]
async fn test_refused_connection_is_a_connect_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let transport = ReqwestTransport::with_default_timeouts().unwrap();

    let err = transport
        .get(&format!("http://127.0.0.1:{port}/current/races"), &[])
        .await
        .unwrap_err();

    assert!(err.is_connect(), "expected connect error, got {err:?}");
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = StubServer::start(vec![StubReply::Stall(Duration::from_secs(3))]);
    let client = build_http_client(Duration::from_millis(200), Duration::from_secs(1)).unwrap();
    let transport = ReqwestTransport::new(client);

    let err = transport
        .get(&format!("{}/2024/races", server.base_url()), &[])
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[tokio::test]
async fn test_client_end_to_end_with_retry() {
    let body = json!({"MRData": {"total": "24", "RaceTable": {"season": "2024", "Races": []}}});
    let server = StubServer::start(vec![
        http_response(429, &[("Retry-After", "0")], ""),
        json_ok(&body),
    ]);
    let client = JolpicaClient::new(ClientConfig {
        base_url: server.base_url(),
        ..ClientConfig::default()
    })
    .unwrap();

    let payload = client.races("2024", 0).await.unwrap();

    assert_eq!(payload, body);
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].starts_with("GET /2024/races?"));
    assert!(requests[1].contains("limit=100"));
    assert!(requests[1].contains("season=2024"));
}

#[tokio::test]
async fn test_client_fail_fast_on_429() {
    let server = StubServer::start(vec![http_response(429, &[("Retry-After", "120")], "")]);
    let client = JolpicaClient::new(ClientConfig {
        base_url: server.base_url(),
        wait_on_rate_limit: false,
        ..ClientConfig::default()
    })
    .unwrap();

    let err = client.results("2024", 1).await.unwrap_err();

    match err {
        ClientError::RateLimitExceeded { retry_after } => {
            assert_eq!(retry_after, Duration::from_secs(120));
        }
        other => panic!("expected rate limit error, got {other:?}"),
    }
}
