//! In-process fake backend for unit tests.
//!
//! A single axum fallback handler records every request and answers from a
//! table of canned responses keyed by `"METHOD /path"`. Unknown routes get a
//! 404 so a missing stub shows up as an `OtherHttp` failure in the test.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::credential::CredentialStore;
use crate::gateway::AuthGateway;
use crate::http::HttpPipeline;
use crate::session::SessionService;
use crate::signal::{Signal, SignalBus, drain};

#[derive(Debug, Clone)]
pub(crate) struct Hit {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl Hit {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Clone)]
struct Canned {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

#[derive(Default)]
struct Shared {
    routes: Mutex<HashMap<String, Canned>>,
    hits: Mutex<Vec<Hit>>,
}

pub(crate) struct FakeBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
    task: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend serve");
        });
        Self { addr, shared, task }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: Value) {
        self.insert(method, path, Canned { status, body: body.to_string(), delay: None });
    }

    pub fn respond_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.insert(method, path, Canned { status, body: body.to_owned(), delay: None });
    }

    pub fn respond_slow(&self, method: &str, path: &str, delay: Duration, body: Value) {
        self.insert(method, path, Canned { status: 200, body: body.to_string(), delay: Some(delay) });
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.shared.hits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn hit_count(&self, method: &str, path: &str) -> usize {
        self.hits().iter().filter(|h| h.method == method && h.path == path).count()
    }

    pub fn last_hit(&self, method: &str, path: &str) -> Hit {
        self.hits()
            .into_iter()
            .rev()
            .find(|h| h.method == method && h.path == path)
            .unwrap_or_else(|| panic!("no {method} {path} request recorded"))
    }

    fn insert(&self, method: &str, path: &str, canned: Canned) {
        self.shared
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(format!("{method} {path}"), canned);
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = format!("{method} {}", uri.path());
    shared.hits.lock().unwrap_or_else(PoisonError::into_inner).push(Hit {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let canned = shared.routes.lock().unwrap_or_else(PoisonError::into_inner).get(&key).cloned();
    let Some(canned) = canned else {
        return (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "application/json")], r#"{"message":"no route"}"#)
            .into_response();
    };
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], canned.body).into_response()
}

pub(crate) fn envelope_ok(data: Value) -> Value {
    json!({ "code": 200, "data": data, "msg": "success" })
}

pub(crate) fn envelope_err(msg: &str) -> Value {
    json!({ "code": 500, "data": null, "msg": msg })
}

/// Fully wired stack against a fresh fake backend.
pub(crate) struct Harness {
    pub backend: FakeBackend,
    pub credentials: CredentialStore,
    pub signals: SignalBus,
    pub rx: broadcast::Receiver<Signal>,
    pub pipeline: Arc<HttpPipeline>,
    pub gateway: AuthGateway,
    pub session: Arc<SessionService>,
}

impl Harness {
    pub async fn start() -> Self {
        Self::with_timeout(Duration::from_secs(5)).await
    }

    pub async fn with_timeout(timeout: Duration) -> Self {
        let backend = FakeBackend::start().await;
        let credentials = CredentialStore::in_memory("blog_token");
        let signals = SignalBus::new();
        let rx = signals.subscribe();
        let pipeline = Arc::new(
            HttpPipeline::with_timeout(&backend.base_url(), timeout, credentials.clone(), signals.clone())
                .expect("build pipeline"),
        );
        let gateway = AuthGateway::new(pipeline.clone());
        let session = Arc::new(SessionService::new(gateway.clone(), credentials.clone()));
        Self { backend, credentials, signals, rx, pipeline, gateway, session }
    }

    pub fn signals_seen(&mut self) -> Vec<Signal> {
        drain(&mut self.rx)
    }
}
