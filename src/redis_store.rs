use std::fmt;

use async_trait::async_trait;
use redis::{AsyncCommands as _, aio::ConnectionManager};
use time::Duration;

use crate::{
    format,
    session::Payload,
    store::{self, SessionStore},
};

/// Redis-backed [`SessionStore`].
///
/// Payloads are stored as JSON under `prefix + session_id` and expire through Redis' own TTL.
/// The connection manager is cheap to clone and reconnects on its own, so one store can serve
/// every request of the process.
///
/// ```no_run
/// use tower_redsession::{RedisStore, ServerSessionManagerLayer, SessionSigner};
///
/// # async fn example() -> Result<(), tower_redsession::store::Error> {
/// let store = RedisStore::open("redis://127.0.0.1:6379").await?.with_prefix("session:");
/// let layer = ServerSessionManagerLayer::new(store, SessionSigner::new("secret"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (`redis://` or `rediss://`).
    pub async fn open(url: &str) -> store::Result<Self> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(store::Error::Backend(
                "Redis URL must start with redis:// or rediss://".to_string(),
            ));
        }

        let client = redis::Client::open(url).map_err(backend_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(backend_error)?;

        Ok(Self::new(conn))
    }

    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            prefix: String::new(),
        }
    }

    /// Namespace every key, e.g. `"session:"`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{session_id}", self.prefix)
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn backend_error(err: redis::RedisError) -> store::Error {
    store::Error::Backend(err.to_string())
}

/// Redis expiries are whole seconds; anything shorter still gets one.
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.whole_seconds() + i64::from(ttl.subsec_nanoseconds() > 0);
    u64::try_from(secs).unwrap_or(0).max(1)
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> store::Result<Option<Payload>> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = conn.get(self.key(key)).await.map_err(backend_error)?;

        match data {
            Some(bytes) if !bytes.is_empty() => format::decode_payload(&bytes).map(Some),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &Payload, ttl: Option<Duration>) -> store::Result<()> {
        let bytes = format::encode_payload(payload)?;
        let mut conn = self.conn.clone();

        let _: () = match ttl {
            Some(ttl) => conn.set_ex(self.key(key), bytes, ttl_seconds(ttl)).await,
            None => conn.set(self.key(key), bytes).await,
        }
        .map_err(backend_error)?;

        Ok(())
    }

    async fn update(&self, key: &str, payload: &Payload) -> store::Result<()> {
        let bytes = format::encode_payload(payload)?;
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(self.key(key))
            .arg(bytes)
            .arg("KEEPTTL")
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend_error)
    }

    async fn delete(&self, key: &str) -> store::Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(self.key(key)).await.map_err(backend_error)?;
        Ok(removed > 0)
    }
}
