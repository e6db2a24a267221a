//! Integration tests for the webhook client against a throw-away HTTP
//! responder on localhost.

use std::time::Duration;

use screenshot_relay::config::RelayConfig;
use screenshot_relay::{
    DeliveryChannel, DeliveryOutcome, ImageBudgeter, RawFrame, WebhookClient, send_test_image,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Serve one request with `status` and `body`; hand back the raw request.
async fn respond_once(
    status: &'static str,
    body: &'static str,
) -> (String, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        let _ = tx.send(request);
    });

    (url, rx)
}

/// Read headers plus a body delimited by Content-Length or chunked encoding.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = find(&buf, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let body = &buf[header_end + 4..];

        if let Some(len) = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            if body.len() >= len {
                return buf;
            }
        } else if headers.contains("transfer-encoding: chunked") {
            if find(body, b"0\r\n\r\n").is_some() {
                return buf;
            }
        } else {
            return buf;
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn payload() -> screenshot_relay::EncodedImage {
    let mut budgeter = ImageBudgeter::from_config(&RelayConfig::default());
    budgeter.fit(RawFrame::solid_rgb(32, 32, [0, 128, 255])).unwrap()
}

#[tokio::test]
async fn test_success_sends_multipart_file() {
    let (url, request) = respond_once("200 OK", "").await;
    let client = WebhookClient::new(url, Duration::from_secs(5)).unwrap();

    let outcome = client.send(payload(), "screenshot_20240101_120000.jpg").await;
    assert_eq!(outcome, DeliveryOutcome::Success { status: 200 });

    let request = String::from_utf8_lossy(&request.await.unwrap()).into_owned();
    assert!(request.starts_with("POST /hook"));
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains("name=\"file\""));
    assert!(request.contains("filename=\"screenshot_20240101_120000.jpg\""));
    assert!(request.contains("image/jpeg"));
}

#[tokio::test]
async fn test_non_2xx_is_rejected_with_body() {
    let (url, _request) = respond_once("500 Internal Server Error", "boom").await;
    let client = WebhookClient::new(url, Duration::from_secs(5)).unwrap();

    let outcome = client.send(payload(), "a.jpg").await;
    assert_eq!(
        outcome,
        DeliveryOutcome::RemoteRejected {
            status: 500,
            body: "boom".to_string(),
        }
    );
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_refused_connection_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    drop(listener);

    let client = WebhookClient::new(url, Duration::from_secs(5)).unwrap();
    let outcome = client.send(payload(), "a.jpg").await;
    assert!(matches!(outcome, DeliveryOutcome::TransientFailure { .. }));
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        // hold the connection open without answering
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = WebhookClient::new(url, Duration::from_millis(300)).unwrap();
    match client.send(payload(), "a.jpg").await {
        DeliveryOutcome::TransientFailure { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_webhook_self_test_image() {
    let (url, request) = respond_once("204 No Content", "").await;
    let config = RelayConfig {
        webhook_url: Some(url),
        ..RelayConfig::default()
    };
    let client = WebhookClient::from_config(&config).unwrap();
    assert_eq!(client.timeout(), Duration::from_secs(30));
    let mut budgeter = ImageBudgeter::from_config(&config);

    let outcome = send_test_image(&client, &mut budgeter).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Success { status: 204 });

    let request = String::from_utf8_lossy(&request.await.unwrap()).into_owned();
    assert!(request.contains("filename=\"test_screenshot.jpg\""));
}
