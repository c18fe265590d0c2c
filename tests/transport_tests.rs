use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use oido_match::classifier::{
    ClassifierClient, ClassifierTransport, HttpTransport, ImageUpload, Label,
};
use oido_match::error::ClassifyError;
use oido_match::retry::RetryPolicy;

/// Serve exactly one HTTP request on a loopback port and hand back the raw
/// request text.
async fn serve_once(status: u16, body: &'static str) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!("http://{}/predict", addr)).unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let headers = text[..header_end].to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let body_len = buf.len() - (header_end + 4);
            match content_length {
                Some(len) if body_len >= len => break,
                None if text.ends_with("0\r\n\r\n") => break,
                _ => {}
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Loopback requests must not be routed through a proxy from the environment.
fn loopback_transport(url: Url) -> HttpTransport {
    let timeout = Duration::from_secs(5);
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .unwrap();
    HttpTransport::with_client(client, url, timeout)
}

fn upload() -> ImageUpload {
    ImageUpload {
        field_name: "image".to_string(),
        file_name: "photo.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: b"\x89PNG fake image bytes".to_vec(),
    }
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy::new(1, Duration::from_millis(10))
}

#[tokio::test]
async fn test_posts_multipart_with_bearer_token() {
    let (url, server) = serve_once(200, r#"{"prediccion":"AOM","probability":0.9}"#).await;
    let transport = loopback_transport(url);
    let client = ClassifierClient::new(transport, single_attempt());

    let result = client.classify(&upload(), "tok-123").await.unwrap();
    let request = server.await.unwrap();

    assert_eq!(result.label, Label::Aom);
    assert_eq!(result.confidence, Some(0.9));
    assert!(request.starts_with("POST /predict"), "{}", request);
    assert!(request.contains("Bearer tok-123"), "{}", request);
    assert!(request.to_ascii_lowercase().contains("multipart/form-data"));
    assert!(request.contains(r#"name="image""#), "{}", request);
    assert!(request.contains(r#"filename="photo.png""#), "{}", request);
    assert!(request.contains("image/png"));
    assert!(request.contains("fake image bytes"));
}

#[tokio::test]
async fn test_transport_reports_raw_status() {
    let (url, server) = serve_once(503, r#"{"detail":"busy"}"#).await;
    let transport = loopback_transport(url);

    let response = transport.send(&upload(), "tok").await.unwrap();
    server.await.unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_success());
    assert!(response.body.contains("busy"));
}

#[tokio::test]
async fn test_401_over_http_is_session_expired() {
    let (url, server) = serve_once(401, r#"{"detail":"expired"}"#).await;
    let transport = loopback_transport(url);
    let client = ClassifierClient::new(transport, RetryPolicy::default());

    let err = client.classify(&upload(), "old").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, ClassifyError::SessionExpired));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{}/predict", addr)).unwrap();
    let transport = loopback_transport(url);
    let client = ClassifierClient::new(transport, single_attempt());

    let err = client.classify(&upload(), "tok").await.unwrap_err();
    assert!(matches!(err, ClassifyError::NetworkFailure(_)), "{:?}", err);
}
