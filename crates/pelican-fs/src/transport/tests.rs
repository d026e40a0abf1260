// crates/pelican-fs/src/transport/tests.rs
// ============================================================================
// Module: HTTP Transport Unit Tests
// Description: Unit tests for request shaping and failure classification.
// Purpose: Validate headers, ranges, status mapping, and size limits.
// Dependencies: pelican-fs, axum
// ============================================================================

//! ## Overview
//! Runs the transport against an in-process axum endpoint.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_LENGTH;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use pelican_core::ByteRange;
use pelican_core::Operation;
use pelican_core::Transport;
use pelican_core::TransportErrorKind;
use pelican_core::TransportRequest;
use tokio::sync::oneshot;
use url::Url;

use super::HttpTransport;
use super::HttpTransportOptions;
use super::slice_range;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const CONTENT: &[u8] = b"0123456789";

#[derive(Default)]
struct Seen {
    method: Option<String>,
    authorization: Option<String>,
    range: Option<String>,
    client: Option<String>,
    body: Vec<u8>,
}

#[derive(Clone)]
struct EndpointState {
    seen: Arc<Mutex<Seen>>,
    honor_ranges: bool,
}

async fn endpoint(State(state): State<EndpointState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, 1024).await.unwrap();
    let header = |headers: &HeaderMap, name: &str| {
        headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
    };
    {
        let mut seen = state.seen.lock().unwrap();
        seen.method = Some(parts.method.to_string());
        seen.authorization = header(&parts.headers, "authorization");
        seen.range = header(&parts.headers, "range");
        seen.client = header(&parts.headers, "x-client");
        seen.body = body.to_vec();
    }
    match parts.uri.path() {
        "/missing" => StatusCode::NOT_FOUND.into_response(),
        "/broken" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "/upload" => StatusCode::CREATED.into_response(),
        _ => {
            if state.honor_ranges
                && let Some(range) = header(&parts.headers, "range")
            {
                let bounds = range.trim_start_matches("bytes=");
                let (start, end) = bounds.split_once('-').unwrap();
                let start: usize = start.parse().unwrap();
                let end: usize = end.parse().unwrap();
                let slice = Bytes::copy_from_slice(&CONTENT[start ..= end]);
                return (StatusCode::PARTIAL_CONTENT, slice).into_response();
            }
            let length = [(CONTENT_LENGTH, CONTENT.len().to_string())];
            (StatusCode::OK, length, Bytes::from_static(CONTENT)).into_response()
        }
    }
}

async fn spawn_endpoint(honor_ranges: bool) -> (Url, Arc<Mutex<Seen>>, oneshot::Sender<()>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let state = EndpointState {
        seen: Arc::clone(&seen),
        honor_ranges,
    };
    let app = Router::new().fallback(endpoint).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (Url::parse(&format!("http://{addr}/")).unwrap(), seen, shutdown_tx)
}

fn transport() -> HttpTransport {
    HttpTransport::new("pelican-fs-tests", &HttpTransportOptions::default()).unwrap()
}

fn request(base: &Url, path: &str, operation: Operation) -> TransportRequest {
    TransportRequest {
        url: base.join(path).unwrap(),
        operation,
        authorization: None,
        headers: BTreeMap::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn get_returns_body_and_forwards_headers() {
    let (base, seen, _shutdown) = spawn_endpoint(false).await;
    let mut get = request(&base, "ns/obj", Operation::Get {
        range: None,
    });
    get.authorization = Some("Bearer abc".to_string());
    get.headers.insert("X-Client".to_string(), "tests".to_string());
    let response = transport().execute(get).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, Bytes::from_static(CONTENT));
    assert_eq!(response.content_length, Some(10));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.method.as_deref(), Some("GET"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer abc"));
    assert_eq!(seen.client.as_deref(), Some("tests"));
}

#[tokio::test]
async fn head_reports_length_without_body() {
    let (base, seen, _shutdown) = spawn_endpoint(false).await;
    let response = transport().execute(request(&base, "ns/obj", Operation::Head)).await.unwrap();
    assert!(response.body.is_empty());
    assert_eq!(response.content_length, Some(10));
    assert_eq!(seen.lock().unwrap().method.as_deref(), Some("HEAD"));
}

#[tokio::test]
async fn ranged_get_sends_inclusive_range() {
    let (base, seen, _shutdown) = spawn_endpoint(true).await;
    let range = ByteRange::new(2, 5).unwrap();
    let response = transport()
        .execute(request(&base, "ns/obj", Operation::Get {
            range: Some(range),
        }))
        .await
        .unwrap();
    assert_eq!(response.status, 206);
    assert_eq!(response.body, Bytes::from_static(b"234"));
    assert_eq!(seen.lock().unwrap().range.as_deref(), Some("bytes=2-4"));
}

#[tokio::test]
async fn full_body_for_ranged_get_is_sliced() {
    let (base, _seen, _shutdown) = spawn_endpoint(false).await;
    let range = ByteRange::new(7, 20).unwrap();
    let response = transport()
        .execute(request(&base, "ns/obj", Operation::Get {
            range: Some(range),
        }))
        .await
        .unwrap();
    assert_eq!(response.body, Bytes::from_static(b"789"));
}

#[tokio::test]
async fn put_sends_body() {
    let (base, seen, _shutdown) = spawn_endpoint(false).await;
    let response = transport()
        .execute(request(&base, "upload", Operation::Put {
            body: Bytes::from_static(b"payload"),
        }))
        .await
        .unwrap();
    assert_eq!(response.status, 201);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.method.as_deref(), Some("PUT"));
    assert_eq!(seen.body, b"payload");
}

#[tokio::test]
async fn non_success_status_is_classified() {
    let (base, _seen, _shutdown) = spawn_endpoint(false).await;
    let missing = transport()
        .execute(request(&base, "missing", Operation::Head))
        .await
        .unwrap_err();
    assert_eq!(missing.kind, TransportErrorKind::Status(404));
    assert_eq!(missing.error_kind(), "status:404");
    let broken = transport()
        .execute(request(&base, "broken", Operation::Get {
            range: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(broken.error_kind(), "status:503");
}

#[tokio::test]
async fn refused_connection_is_connect_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let error = transport().execute(request(&base, "ns/obj", Operation::Head)).await.unwrap_err();
    assert_eq!(error.kind, TransportErrorKind::Connect);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (base, _seen, _shutdown) = spawn_endpoint(false).await;
    let options = HttpTransportOptions {
        max_response_bytes: Some(4),
        ..HttpTransportOptions::default()
    };
    let transport = HttpTransport::new("pelican-fs-tests", &options).unwrap();
    let error = transport
        .execute(request(&base, "ns/obj", Operation::Get {
            range: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(error.kind, TransportErrorKind::Body);
}

#[test]
fn slicing_clamps_to_body() {
    let body = Bytes::from_static(CONTENT);
    assert_eq!(slice_range(&body, 8, 100), Bytes::from_static(b"89"));
    assert!(slice_range(&body, 50, 60).is_empty());
}
