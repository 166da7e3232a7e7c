//! The storage contract the session layer persists payloads through.
//!
//! The middleware only ever talks to a [`SessionStore`]; [`RedisStore`](crate::RedisStore) is the
//! implementation shipped with this crate, and any other backend can be dropped in without
//! touching the layer.

use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;

use crate::session::Payload;

/// Errors raised by stores and by typed access to a [`Session`](crate::Session).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Backend failed: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Asynchronous key/value access to session payloads, keyed by session id.
///
/// Calls may suspend the request that issued them but must never block other requests. No
/// retries happen in the layer; a store that wants them implements them itself.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load the payload stored under `key`, or `None` if it is missing or expired.
    async fn get(&self, key: &str) -> Result<Option<Payload>>;

    /// Write a new payload. `ttl = None` stores the record without expiry.
    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> Result<()>;

    /// Overwrite an existing payload, keeping whatever expiry the record currently has.
    async fn update(&self, key: &str, payload: &Payload) -> Result<()>;

    /// Remove the record. Returns `true` when something was deleted.
    async fn delete(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> Result<()> {
        (**self).set(key, payload, ttl).await
    }

    async fn update(&self, key: &str, payload: &Payload) -> Result<()> {
        (**self).update(key, payload).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }
}

#[async_trait]
impl<S: SessionStore + ?Sized> SessionStore for Box<S> {
    async fn get(&self, key: &str) -> Result<Option<Payload>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> Result<()> {
        (**self).set(key, payload, ttl).await
    }

    async fn update(&self, key: &str, payload: &Payload) -> Result<()> {
        (**self).update(key, payload).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }
}
