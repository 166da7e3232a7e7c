//! Server-side sessions for `tower` and `axum`.
//!
//! The client only ever holds a signed, random session id in a cookie; the session payload (a JSON
//! object) lives in a [`SessionStore`], Redis by default.
//!
//! # Lifecycle
//! For every request the layer loads the session named by a validly signed cookie, hands the
//! inner service a [`Session`] through the request extensions, and once the response is ready:
//!
//! - creates a new session (store `set` + cookie) when an empty session received data,
//! - updates the stored payload when an existing session still has data (its TTL is kept),
//! - deletes the session and clears the cookie when an existing session was emptied,
//! - does nothing at all otherwise.
//!
//! Cookies with a bad signature are treated as absent. Store failures are not: they turn the
//! response into `500 Internal Server Error` and no cookie is sent.
//!
//! # Example
//! ```no_run
//! use axum::{Router, routing::get};
//! use tower_redsession::{
//!     RedisStore, ServerSessionConfig, ServerSessionManagerLayer, Session, SessionSigner,
//! };
//!
//! async fn visits(session: Session) -> String {
//!     let n: u64 = session.get("n").ok().flatten().unwrap_or(0);
//!     session.insert("n", n + 1).expect("counter serializes");
//!     format!("n={n}")
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::open("redis://127.0.0.1:6379").await?;
//! let signer = SessionSigner::new("new secret").with_fallback("old secret");
//! let layer = ServerSessionManagerLayer::new(store, signer)
//!     .with_config(ServerSessionConfig::default().with_https_only(true));
//!
//! let app: Router = Router::new().route("/", get(visits)).layer(layer);
//! # Ok(())
//! # }
//! ```

mod config;
pub mod format;
pub mod layer;
#[cfg(feature = "redis")]
mod redis_store;
mod session;
mod signer;
pub mod store;

pub use time::Duration;
pub use tower_cookies::cookie::SameSite;

pub use crate::config::{
    DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE, DEFAULT_SESSION_ID_LENGTH, ServerSessionConfig,
};
pub use crate::layer::{ServerSessionManager, ServerSessionManagerLayer};
pub use crate::session::{Payload, Session};
pub use crate::signer::SessionSigner;
pub use crate::store::SessionStore;

#[cfg(feature = "redis")]
pub use crate::redis_store::RedisStore;
