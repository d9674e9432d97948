// crates/network/tests/network_tests.rs
//! Integration tests against a throwaway local HTTP server

use serde::Deserialize;
use shelfwise_network::{Client, ClientConfig, NetworkError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one canned response per accepted connection, in order
async fn serve(responses: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{}", addr)
}

fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        status,
        body.len(),
        extra_headers,
        body
    )
}

fn client_without_retries() -> Client {
    Client::with_config(ClientConfig {
        timeout: Duration::from_secs(5),
        retry_policy: None,
        ..ClientConfig::default()
    })
    .expect("client")
}

#[derive(Debug, Deserialize)]
struct Search {
    total: u32,
}

#[tokio::test]
async fn test_get_json_decodes_body() {
    let base = serve(vec![http_response("200 OK", "", r#"{"total": 3}"#)]).await;
    let client = client_without_retries();

    let result: Search = client
        .get_json(&format!("{}/search.json", base), &[("title", "The Hobbit")])
        .await
        .expect("decoded response");
    assert_eq!(result.total, 3);
}

#[tokio::test]
async fn test_rate_limit_keeps_body_and_hint() {
    let base = serve(vec![http_response(
        "429 Too Many Requests",
        "Retry-After: 12\r\n",
        r#"{"error": "Please retry in 12.5s"}"#,
    )])
    .await;
    let client = client_without_retries();

    let err = client
        .get_json::<Search>(&base, &[])
        .await
        .expect_err("429 is an error");

    assert!(err.is_rate_limited());
    assert!(err.body().unwrap_or_default().contains("retry in 12.5s"));
    match err {
        NetworkError::Status { retry_after, .. } => {
            assert_eq!(retry_after, Some(Duration::from_secs(12)))
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let base = serve(vec![http_response("200 OK", "", "<html>oops</html>")]).await;
    let client = client_without_retries();

    let err = client
        .get_json::<Search>(&base, &[])
        .await
        .expect_err("not json");
    assert!(matches!(err, NetworkError::Decode { .. }));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let base = serve(vec![
        http_response("503 Service Unavailable", "", "{}"),
        http_response("200 OK", "", r#"{"total": 1}"#),
    ])
    .await;
    let client = Client::with_config(ClientConfig {
        timeout: Duration::from_secs(5),
        retry_policy: Some(
            shelfwise_resilience::RetryPolicy::new(2).with_initial_delay(Duration::from_millis(10)),
        ),
        ..ClientConfig::default()
    })
    .expect("client");

    let result: Search = client.get_json(&base, &[]).await.expect("second try");
    assert_eq!(result.total, 1);
}

#[tokio::test]
async fn test_post_json() {
    let base = serve(vec![http_response("200 OK", "", r#"{"total": 9}"#)]).await;
    let client = client_without_retries();

    let result: Search = client
        .post_json(&base, &[("authorization", "Bearer token")], &serde_json::json!({"query": "{}"}))
        .await
        .expect("decoded response");
    assert_eq!(result.total, 9);
}
