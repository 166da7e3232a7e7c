use std::net::SocketAddr;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tower_redsession::{
    Duration, RedisStore, SameSite, ServerSessionConfig, ServerSessionManagerLayer, Session,
    SessionSigner,
};
use tracing_subscriber::EnvFilter;

async fn set_session(session: Session) -> Json<Value> {
    session.insert("id", 1).expect("session insert succeeds");
    Json(json!({ "session": session }))
}

async fn get_session(session: Session) -> Json<Value> {
    Json(json!({ "session": session }))
}

async fn update_session(session: Session) -> Json<Value> {
    session.clear();
    session
        .insert("user_id", 2)
        .expect("session insert succeeds");
    Json(json!({ "session": session }))
}

async fn delete_session(session: Session) -> Json<Value> {
    session.clear();
    Json(json!({ "session": session }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_redsession=debug")),
        )
        .init();

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let secret = std::env::var("SESSION_SECRET").unwrap_or_else(|_| "change me".to_string());

    let store = RedisStore::open(&redis_url)
        .await
        .expect("redis store connects")
        .with_prefix("session:");
    let session_config = ServerSessionConfig::default()
        // Default: "s"
        .with_name("s")
        // Default: one week
        .with_max_age(Some(Duration::days(1)))
        // Default: SameSite::Lax
        .with_same_site(SameSite::Lax)
        // Default: false (set to true behind HTTPS)
        .with_https_only(false)
        // Default: "/"
        .with_path("/");
    let session_layer = ServerSessionManagerLayer::new(store, SessionSigner::new(secret))
        .with_config(session_config);

    let app = Router::new()
        .route("/set_session", post(set_session))
        .route("/get_session", get(get_session))
        .route("/update_session", put(update_session))
        .route("/delete_session", delete(delete_session))
        .layer(session_layer);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    tracing::info!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
