use housewatch_core::config::{Secret, Settings};
use housewatch_core::ingest::{AddressQuery, ListingProvider, ScrapeakClient};
use housewatch_core::Error;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single canned HTTP response and hands back the request head.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let resp = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        String::from_utf8_lossy(&buf).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> ScrapeakClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    ScrapeakClient::with_http(http, base_url, Secret::new("test-key"))
}

fn request_line(head: &str) -> &str {
    head.lines().next().unwrap_or_default()
}

#[tokio::test]
async fn fetch_listings_sends_key_and_url_and_returns_results() {
    let body = json!({
        "is_success": true,
        "data": {"cat1": {"searchResults": {"mapResults": [
            {"zpid": "1", "address": "123 Main St"},
            {"zpid": "2", "address": "9 Oak Ave"}
        ]}}}
    })
    .to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let raw = client(&base)
        .fetch_listings("https://www.zillow.com/atlanta-ga/")
        .await
        .unwrap();
    assert_eq!(raw.results.len(), 2);
    assert_eq!(raw.results[0]["address"], "123 Main St");

    let head = server.await.unwrap();
    let line = request_line(&head);
    assert!(line.starts_with("GET /v1/scrapers/zillow/listing?"));
    assert!(line.contains("api_key=test-key"));
    assert!(line.contains("url=https%3A%2F%2Fwww.zillow.com%2Fatlanta-ga%2F"));
}

#[tokio::test]
async fn non_success_status_is_a_network_error() {
    let (base, _server) = serve_once("401 Unauthorized", r#"{"message":"bad key"}"#.to_string()).await;

    let err = client(&base).fetch_listings("https://x").await.unwrap_err();
    match err {
        Error::Network(msg) => {
            assert!(msg.contains("401"));
            assert!(!msg.contains("test-key"));
        }
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_results_path_is_a_schema_error() {
    let (base, _server) = serve_once("200 OK", json!({"data": {}}).to_string()).await;
    let err = client(&base).fetch_listings("https://x").await.unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[tokio::test]
async fn non_json_body_is_a_schema_error() {
    let (base, _server) = serve_once("200 OK", "<html>oops</html>".to_string()).await;
    let err = client(&base).fetch_listings("https://x").await.unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

#[tokio::test]
async fn unreachable_provider_is_a_network_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .fetch_listings("https://x")
        .await
        .unwrap_err();
    match err {
        Error::Network(msg) => {
            assert!(msg.contains("could not connect"), "{msg}");
            assert!(!msg.contains("timed out"), "{msg}");
        }
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_provider_times_out_with_configured_limit() {
    // Accepts the connection, then never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(sock);
    });

    let settings = Settings::from_toml_str(
        &format!(
            r#"
            api_key = "test-key"
            listing_url = "https://www.zillow.com/atlanta-ga/"
            zip_codes_to_check = [30301]

            [email_config]
            sender_email = "alerts@example.com"
            receiver_emails = ["me@example.com"]
            smtp_password = "p"

            [provider]
            base_url = "http://{addr}"
            timeout_secs = 1
            "#
        ),
        |_| None,
    )
    .unwrap();

    let started = Instant::now();
    let err = ScrapeakClient::from_settings(&settings)
        .unwrap()
        .fetch_listings("https://x")
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));

    match err {
        Error::Network(msg) => {
            assert!(msg.contains("timed out"), "{msg}");
            assert!(!msg.contains("test-key"), "{msg}");
        }
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn property_detail_returns_data_member() {
    let body = json!({"data": {"zpid": 123, "price": 150000}}).to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let detail = client(&base).fetch_property_detail("123").await.unwrap();
    assert_eq!(detail["price"], 150000);

    let head = server.await.unwrap();
    let line = request_line(&head);
    assert!(line.starts_with("GET /v1/scrapers/zillow/property?"));
    assert!(line.contains("zpid=123"));
}

#[tokio::test]
async fn resolve_property_id_omits_absent_zip_code() {
    let body = json!({"data": {"zpid": 35619412}}).to_string();
    let (base, server) = serve_once("200 OK", body).await;

    let query = AddressQuery {
        street: "123 Main St".to_string(),
        city: "Atlanta".to_string(),
        state: "GA".to_string(),
        zip_code: None,
    };
    let resolved = client(&base).resolve_property_id(&query).await.unwrap();
    assert_eq!(resolved["zpid"], 35619412);

    let head = server.await.unwrap();
    let line = request_line(&head);
    assert!(line.starts_with("GET /v1/scrapers/zillow/zpidByAddress?"));
    assert!(line.contains("street=123+Main+St"));
    assert!(line.contains("city=Atlanta"));
    assert!(line.contains("state=GA"));
    assert!(!line.contains("zip_code"));
}

#[tokio::test]
async fn resolve_property_id_passes_zip_code_when_given() {
    let (base, server) = serve_once("200 OK", json!({"data": {}}).to_string()).await;

    let query = AddressQuery {
        street: "1 A St".to_string(),
        city: "Atlanta".to_string(),
        state: "GA".to_string(),
        zip_code: Some("30301".to_string()),
    };
    client(&base).resolve_property_id(&query).await.unwrap();

    let head = server.await.unwrap();
    assert!(request_line(&head).contains("zip_code=30301"));
}

#[tokio::test]
async fn auxiliary_call_without_data_is_a_schema_error() {
    let (base, _server) = serve_once("200 OK", json!({"message": "nothing"}).to_string()).await;
    let err = client(&base).fetch_property_detail("1").await.unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}
