// crates/pelican-fs/tests/common/mod.rs
// ============================================================================
// Module: Federation Test Harness
// Description: In-process discovery, director, cache, and origin stubs.
// Purpose: Drive pelican-fs end to end without external services.
// Dependencies: axum, pelican-fs, tokio
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_LENGTH;
use axum::http::header::LINK;
use axum::http::header::LOCATION;
use axum::response::Response;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use pelican_config::PelicanConfig;
use pelican_core::SystemClock;
use pelican_fs::HttpTransport;
use pelican_fs::HttpTransportOptions;
use pelican_fs::PelicanFileSystem;
use pelican_fs::TokenEnvironment;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

/// Issuer every test federation advertises.
pub const ISSUER: &str = "https://issuer.example.org";
/// Discovery document path.
const DISCOVERY_PATH: &str = "/.well-known/pelican-configuration";
/// Director origin query prefix.
const ORIGIN_PREFIX: &str = "/api/v1.0/director/origin";

// ============================================================================
// SECTION: Server Plumbing
// ============================================================================

/// Binds an ephemeral listener and returns it with its base URL.
async fn bind() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    (listener, Url::parse(&format!("http://{addr}/")).expect("base url"))
}

/// Serves `app` until the returned sender is dropped or fired.
fn serve(listener: TcpListener, app: Router) -> oneshot::Sender<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    shutdown_tx
}

// ============================================================================
// SECTION: Cache and Origin Endpoints
// ============================================================================

/// What an endpoint observed.
#[derive(Debug, Default)]
pub struct EndpointLog {
    /// Request paths in arrival order.
    pub paths: Vec<String>,
    /// Methods in arrival order.
    pub methods: Vec<String>,
    /// Last `Authorization` header, if any.
    pub authorization: Option<String>,
    /// Last request body.
    pub body: Vec<u8>,
}

/// A stub cache or origin that answers every request with one status.
pub struct Endpoint {
    /// Endpoint base URL.
    pub base: Url,
    /// Observed requests.
    pub log: Arc<Mutex<EndpointLog>>,
    /// Keeps the server alive.
    _shutdown: oneshot::Sender<()>,
}

impl Endpoint {
    /// Returns the number of requests received.
    pub fn hits(&self) -> usize {
        self.log.lock().unwrap().paths.len()
    }

    /// Returns the last `Authorization` header received.
    pub fn authorization(&self) -> Option<String> {
        self.log.lock().unwrap().authorization.clone()
    }
}

/// Endpoint handler state.
#[derive(Clone)]
struct EndpointState {
    status: StatusCode,
    content: &'static [u8],
    log: Arc<Mutex<EndpointLog>>,
}

async fn endpoint_handler(State(state): State<EndpointState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, 1 << 20).await.unwrap();
    {
        let mut log = state.log.lock().unwrap();
        log.paths.push(parts.uri.path().to_string());
        log.methods.push(parts.method.to_string());
        log.authorization =
            parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);
        log.body = body.to_vec();
    }
    let content = if state.status.is_success() && parts.method != Method::PUT {
        state.content
    } else {
        b""
    };
    Response::builder()
        .status(state.status)
        .header(CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .unwrap()
}

/// Starts an endpoint answering `status` with `content` on success.
pub async fn spawn_endpoint(status: u16, content: &'static [u8]) -> Endpoint {
    let (listener, base) = bind().await;
    let log = Arc::new(Mutex::new(EndpointLog::default()));
    let state = EndpointState {
        status: StatusCode::from_u16(status).unwrap(),
        content,
        log: Arc::clone(&log),
    };
    let app = Router::new().fallback(endpoint_handler).with_state(state);
    Endpoint {
        base,
        log,
        _shutdown: serve(listener, app),
    }
}

// ============================================================================
// SECTION: Federation Stub
// ============================================================================

/// Scripted director answer for one logical path.
#[derive(Debug, Clone)]
pub struct DirectorAnswer {
    /// Status for the object query.
    pub status: u16,
    /// Raw `Link` header value.
    pub link: Option<String>,
    /// Raw `Location` header value.
    pub location: Option<String>,
    /// Raw `X-Pelican-Namespace` header value.
    pub namespace: Option<String>,
    /// Raw `X-Pelican-Token-Generation` header value.
    pub token_generation: Option<String>,
    /// Origin returned by the origin query.
    pub origin: Option<Url>,
    /// `Link` header returned for PROPFIND.
    pub listing: Option<String>,
}

impl Default for DirectorAnswer {
    fn default() -> Self {
        Self {
            status: 307,
            link: None,
            location: None,
            namespace: None,
            token_generation: None,
            origin: None,
            listing: None,
        }
    }
}

impl DirectorAnswer {
    /// Answers with the given caches in priority order and a public namespace.
    pub fn caches(prefix: &str, caches: &[&Endpoint]) -> Self {
        let link = caches
            .iter()
            .enumerate()
            .map(|(index, cache)| format!("<{}>; rel=\"duplicate\"; pri={}", cache.base, index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            link: (!link.is_empty()).then_some(link),
            namespace: Some(format!("namespace={prefix}, require-token=false")),
            ..Self::default()
        }
    }

    /// Sets the origin returned by the origin query.
    pub fn with_origin(mut self, origin: &Endpoint) -> Self {
        self.origin = Some(origin.base.clone());
        self
    }
}

/// Shared federation state.
#[derive(Default)]
pub struct FederationState {
    /// Director answers by exact logical path.
    pub answers: Mutex<BTreeMap<String, DirectorAnswer>>,
    /// Discovery document override.
    pub document: Mutex<Option<Value>>,
    /// Discovery document fetches.
    pub discovery_hits: AtomicUsize,
    /// Director object queries.
    pub object_queries: AtomicUsize,
    /// Director origin queries.
    pub origin_queries: AtomicUsize,
}

/// A stub federation: discovery document plus director on one listener.
pub struct Federation {
    /// Base URL used as the discovery URL.
    pub base: Url,
    /// Shared scripted state.
    pub state: Arc<FederationState>,
    /// Keeps the server alive.
    _shutdown: oneshot::Sender<()>,
}

impl Federation {
    /// Scripts the director answer for `path`.
    pub fn answer(&self, path: &str, answer: DirectorAnswer) {
        self.state.answers.lock().unwrap().insert(path.to_string(), answer);
    }

    /// Replaces the discovery document.
    pub fn document(&self, document: Value) {
        *self.state.document.lock().unwrap() = Some(document);
    }

    /// Returns the number of director object queries.
    pub fn object_queries(&self) -> usize {
        self.state.object_queries.load(Ordering::SeqCst)
    }

    /// Returns the number of discovery document fetches.
    pub fn discovery_hits(&self) -> usize {
        self.state.discovery_hits.load(Ordering::SeqCst)
    }

    /// Returns the `pelican://` form of a logical path in this federation.
    pub fn qualified(&self, path: &str) -> String {
        let host = self.base.host_str().unwrap();
        let port = self.base.port().unwrap();
        format!("pelican://{host}:{port}{path}")
    }
}

/// Handler state carrying the federation base URL.
#[derive(Clone)]
struct DirectorState {
    base: Url,
    shared: Arc<FederationState>,
}

fn answer_for(state: &DirectorState, path: &str) -> Option<DirectorAnswer> {
    state.shared.answers.lock().unwrap().get(path).cloned()
}

async fn director_handler(State(state): State<DirectorState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();
    if path == DISCOVERY_PATH {
        state.shared.discovery_hits.fetch_add(1, Ordering::SeqCst);
        let document = state.shared.document.lock().unwrap().clone().unwrap_or_else(|| {
            json!({
                "director_endpoint": state.base.as_str(),
                "namespace_registration_endpoint": state.base.join("registry").unwrap().as_str(),
                "issuer": ISSUER,
            })
        });
        return Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Body::from(document.to_string()))
            .unwrap();
    }
    if let Some(logical) = path.strip_prefix(ORIGIN_PREFIX) {
        state.shared.origin_queries.fetch_add(1, Ordering::SeqCst);
        return match answer_for(&state, logical).and_then(|answer| answer.origin) {
            Some(origin) => Response::builder()
                .status(StatusCode::TEMPORARY_REDIRECT)
                .header(LOCATION, origin.join(logical.trim_start_matches('/')).unwrap().as_str())
                .body(Body::empty())
                .unwrap(),
            None => not_found(),
        };
    }
    if request.method().as_str() == "PROPFIND" {
        return match answer_for(&state, &path).and_then(|answer| answer.listing) {
            Some(link) => Response::builder()
                .status(StatusCode::MULTI_STATUS)
                .header(LINK, link)
                .body(Body::empty())
                .unwrap(),
            None => not_found(),
        };
    }
    state.shared.object_queries.fetch_add(1, Ordering::SeqCst);
    let Some(answer) = answer_for(&state, &path) else {
        return not_found();
    };
    let mut builder = Response::builder().status(StatusCode::from_u16(answer.status).unwrap());
    if let Some(link) = answer.link {
        builder = builder.header(LINK, link);
    }
    if let Some(location) = answer.location {
        builder = builder.header(LOCATION, location);
    }
    if let Some(namespace) = answer.namespace {
        builder = builder.header("X-Pelican-Namespace", namespace);
    }
    if let Some(token_generation) = answer.token_generation {
        builder = builder.header("X-Pelican-Token-Generation", token_generation);
    }
    builder.body(Body::empty()).unwrap()
}

fn not_found() -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).body(Body::empty()).unwrap()
}

/// Starts a federation stub.
pub async fn spawn_federation() -> Federation {
    let (listener, base) = bind().await;
    let shared = Arc::new(FederationState::default());
    let state = DirectorState {
        base: base.clone(),
        shared: Arc::clone(&shared),
    };
    let app = Router::new().fallback(director_handler).with_state(state);
    Federation {
        base,
        state: shared,
        _shutdown: serve(listener, app),
    }
}

// ============================================================================
// SECTION: Client Construction
// ============================================================================

/// Builds a config TOML for `federation` with extra sections appended.
pub fn config_toml(federation: &Federation, extra: &str) -> String {
    format!(
        "[federation]\ndiscovery_url = \"{}\"\nallow_http = true\n{extra}",
        federation.base.as_str().trim_end_matches('/')
    )
}

/// Parses a config for `federation`.
pub fn config(federation: &Federation, extra: &str) -> PelicanConfig {
    PelicanConfig::from_toml(&config_toml(federation, extra)).expect("config")
}

/// Token environment that never reads the process environment or home.
pub fn isolated_env(dir: &Path, vars: &[(&str, String)]) -> TokenEnvironment {
    let overrides: BTreeMap<String, String> =
        vars.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect();
    TokenEnvironment::with_overrides(overrides)
        .working_dir(dir)
        .default_token_file(dir.join("no-default-token"))
}

/// Builds a filesystem over the real HTTP transport.
pub fn filesystem(config: &PelicanConfig, environment: TokenEnvironment) -> PelicanFileSystem {
    let options = HttpTransportOptions::default();
    let transport = HttpTransport::new("pelican-fs-tests", &options).expect("transport");
    let clock = Arc::new(SystemClock);
    PelicanFileSystem::with_backends(config, Arc::new(transport), environment, clock)
        .expect("filesystem")
}

/// Returns an unsigned JWT valid for one hour.
pub fn jwt(issuer: &str, scope: &str) -> String {
    let exp = OffsetDateTime::now_utc().unix_timestamp() + 3600;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
    let claims = json!({"iss": issuer, "exp": exp, "scope": scope});
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
