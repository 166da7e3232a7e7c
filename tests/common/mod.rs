#![allow(dead_code)]

// Shared helpers for integration tests.
//
// `MemoryStore` stands in for Redis: it keeps payloads in a map, remembers the TTL each record was
// written with, and counts every call so tests can assert exactly which store operations a
// request caused.
use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::body::Body;
use http::{HeaderMap, Request, Response, header};
use http_body_util::BodyExt as _;
use tower_cookies::Cookie;
use tower_redsession::{
    Duration, Payload, ServerSessionConfig, ServerSessionManagerLayer, Session, SessionSigner,
    SessionStore, store,
};

pub const SECRET: &str = "secret";

#[derive(Debug, Clone)]
pub struct Record {
    pub payload: Payload,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub get: AtomicUsize,
    pub set: AtomicUsize,
    pub update: AtomicUsize,
    pub delete: AtomicUsize,
}

impl Calls {
    /// `(get, set, update, delete)`
    pub fn snapshot(&self) -> (usize, usize, usize, usize) {
        (
            self.get.load(Ordering::SeqCst),
            self.set.load(Ordering::SeqCst),
            self.update.load(Ordering::SeqCst),
            self.delete.load(Ordering::SeqCst),
        )
    }

    pub fn writes(&self) -> usize {
        let (_, set, update, delete) = self.snapshot();
        set + update + delete
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Record>>,
    pub calls: Calls,
}

impl MemoryStore {
    pub fn record(&self, key: &str) -> Option<Record> {
        self.records.lock().expect("lock").get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("lock").len()
    }

    pub fn evict(&self, key: &str) {
        self.records.lock().expect("lock").remove(key);
    }

    pub fn insert(&self, key: &str, payload: Payload, ttl: Option<Duration>) {
        self.records
            .lock()
            .expect("lock")
            .insert(key.to_string(), Record { payload, ttl });
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> store::Result<Option<Payload>> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        Ok(self.record(key).map(|record| record.payload))
    }

    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> store::Result<()> {
        self.calls.set.fetch_add(1, Ordering::SeqCst);
        self.insert(key, payload.clone(), ttl);
        Ok(())
    }

    async fn update(&self, key: &str, payload: &Payload) -> store::Result<()> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().expect("lock");
        let ttl = records.get(key).and_then(|record| record.ttl);
        records.insert(
            key.to_string(),
            Record {
                payload: payload.clone(),
                ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> store::Result<bool> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().expect("lock").remove(key).is_some())
    }
}

/// Which store operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    Get,
    Set,
    Update,
    Delete,
}

/// A store that behaves like `MemoryStore` except for one operation, which always errors.
#[derive(Debug)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_on: FailOn,
}

impl FlakyStore {
    pub fn new(fail_on: FailOn) -> Self {
        Self {
            inner: MemoryStore::default(),
            fail_on,
        }
    }

    fn check(&self, op: FailOn) -> store::Result<()> {
        if self.fail_on == op {
            return Err(store::Error::Backend("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get(&self, key: &str) -> store::Result<Option<Payload>> {
        self.check(FailOn::Get)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> store::Result<()> {
        self.check(FailOn::Set)?;
        self.inner.set(key, payload, ttl).await
    }

    async fn update(&self, key: &str, payload: &Payload) -> store::Result<()> {
        self.check(FailOn::Update)?;
        self.inner.update(key, payload).await
    }

    async fn delete(&self, key: &str) -> store::Result<bool> {
        self.check(FailOn::Delete)?;
        self.inner.delete(key).await
    }
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn body_json(body: Body) -> serde_json::Value {
    serde_json::from_str(&body_string(body).await).expect("body is valid json")
}

pub async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Basic handler used by many tests: write a single key into the session.
    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .expect("request includes Session extension");

    session.insert("foo", 42).expect("session insert succeeds");

    Ok(Response::new(Body::empty()))
}

pub async fn clear_handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .expect("request includes Session extension");

    session.clear();

    Ok(Response::new(Body::empty()))
}

pub async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Handler that does not access the session at all.
    Ok(Response::new(Body::empty()))
}

pub fn make_layer(
    config: ServerSessionConfig,
) -> (Arc<MemoryStore>, ServerSessionManagerLayer<MemoryStore>) {
    // Create a layer over a fresh memory store and return the store for inspection.
    let store = Arc::new(MemoryStore::default());
    let layer = ServerSessionManagerLayer::from_shared(store.clone(), SessionSigner::new(SECRET))
        .with_config(config);
    (store, layer)
}

pub fn session_id_of(cookie: &Cookie<'_>) -> String {
    SessionSigner::new(SECRET)
        .unsign(cookie.value())
        .expect("cookie carries a valid signature")
        .to_string()
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    // Convenience: parse the session cookie from a response.
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    // Parse the `Set-Cookie` header into a `Cookie` structure.
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn raw_set_cookie(res: &Response<Body>) -> String {
    res.headers()
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header")
        .to_str()
        .expect("set-cookie header is valid utf-8")
        .to_string()
}

pub fn has_set_cookie(res: &Response<Body>) -> bool {
    res.headers().get(header::SET_COOKIE).is_some()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().stripped().to_string()
}
