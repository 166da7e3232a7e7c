use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rand::RngCore as _;
use serde::{Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;

use crate::store;

/// Session data: a JSON object keyed by strings.
pub type Payload = serde_json::Map<String, Value>;

/// Generate a fresh session id: `length` random bytes, hex encoded.
pub(crate) fn generate_session_id(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The session of the current request.
///
/// The layer inserts one into the request extensions before calling the inner service. Clones
/// share the same payload, so changes made by a handler are what the layer sees once the response
/// is produced. A handle never outlives its request in any meaningful way: the layer reads it once
/// and a new one is built for the next request.
#[derive(Clone, Default)]
pub struct Session {
    payload: Arc<Mutex<Payload>>,
}

impl Session {
    pub(crate) fn new(payload: Payload) -> Self {
        Self {
            payload: Arc::new(Mutex::new(payload)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Payload> {
        // Every critical section is a plain map operation, so a poisoned guard still holds a
        // consistent map.
        self.payload.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a value and deserialize it into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> store::Result<Option<T>> {
        self.get_value(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| store::Error::Decode(err.to_string()))
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Serialize `value` and store it under `key`, returning the previous value.
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> store::Result<Option<Value>> {
        let value =
            serde_json::to_value(value).map_err(|err| store::Error::Encode(err.to_string()))?;
        Ok(self.insert_value(key, value))
    }

    pub fn insert_value(&self, key: &str, value: Value) -> Option<Value> {
        self.lock().insert(key.to_owned(), value)
    }

    /// Remove a value and deserialize it into `T`.
    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> store::Result<Option<T>> {
        self.remove_value(key)
            .map(serde_json::from_value)
            .transpose()
            .map_err(|err| store::Error::Decode(err.to_string()))
    }

    pub fn remove_value(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every value. If the session existed before this request, the layer deletes it from
    /// the store and clears the cookie.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Merge `values` into the session, overwriting existing keys.
    pub fn extend(&self, values: Payload) {
        self.lock().extend(values);
    }

    /// Replace the whole payload.
    pub fn replace(&self, payload: Payload) {
        *self.lock() = payload;
    }

    /// A snapshot of the current payload.
    pub fn to_map(&self) -> Payload {
        self.lock().clone()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("keys", &self.keys())
            .finish()
    }
}

impl Serialize for Session {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.lock().serialize(serializer)
    }
}

#[cfg(feature = "axum-core")]
impl<S> axum_core::extract::FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (http::StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or((
            http::StatusCode::INTERNAL_SERVER_ERROR,
            "Can't extract session. Is `ServerSessionManagerLayer` enabled?",
        ))
    }
}
