use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response, StatusCode};
use tower_cookies::{CookieManager, Cookies};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    config::ServerSessionConfig,
    session::{Payload, Session, generate_session_id},
    signer::SessionSigner,
    store::SessionStore,
};

/// Where the request's session came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Origin {
    /// No cookie, a cookie that failed verification, or a session the store no longer has.
    Fresh,
    /// A validly signed session id the store resolved.
    Loaded(String),
}

/// The single store mutation (if any) a request ends with.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reconcile<'a> {
    Create,
    Nothing,
    Update(&'a str),
    Delete(&'a str),
}

impl<'a> Reconcile<'a> {
    pub(crate) fn plan(origin: &'a Origin, payload: &Payload) -> Self {
        match (origin, payload.is_empty()) {
            (Origin::Fresh, false) => Self::Create,
            (Origin::Fresh, true) => Self::Nothing,
            (Origin::Loaded(session_id), false) => Self::Update(session_id),
            (Origin::Loaded(session_id), true) => Self::Delete(session_id),
        }
    }
}

/// Layer installing server-side sessions.
///
/// The wrapped service finds a [`Session`] in its request extensions. Once it has produced a
/// response, the layer writes the outcome back to the store and sets or clears the cookie.
#[derive(Debug)]
pub struct ServerSessionManagerLayer<S: SessionStore> {
    store: Arc<S>,
    signer: SessionSigner,
    config: ServerSessionConfig,
}

impl<S: SessionStore> Clone for ServerSessionManagerLayer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            signer: self.signer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: SessionStore> ServerSessionManagerLayer<S> {
    pub fn new(store: S, signer: SessionSigner) -> Self {
        Self::from_shared(Arc::new(store), signer)
    }

    /// Build a layer over a store that is already shared elsewhere in the process.
    pub fn from_shared(store: Arc<S>, signer: SessionSigner) -> Self {
        Self {
            store,
            signer,
            config: ServerSessionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ServerSessionConfig) -> Self {
        self.config = config;
        self
    }
}

#[derive(Debug)]
pub struct ServerSessionManager<T, S: SessionStore> {
    inner: T,
    store: Arc<S>,
    signer: SessionSigner,
    config: ServerSessionConfig,
}

impl<T: Clone, S: SessionStore> Clone for ServerSessionManager<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: self.store.clone(),
            signer: self.signer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T, S: SessionStore> Layer<T> for ServerSessionManagerLayer<S> {
    type Service = CookieManager<ServerSessionManager<T, S>>;

    fn layer(&self, inner: T) -> Self::Service {
        CookieManager::new(ServerSessionManager {
            inner,
            store: self.store.clone(),
            signer: self.signer.clone(),
            config: self.config.clone(),
        })
    }
}

fn internal_server_error<B: Default>() -> Response<B> {
    let mut res = Response::default();
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res
}

impl<ReqBody, ResBody, T, S> Service<Request<ReqBody>> for ServerSessionManager<T, S>
where
    T: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    T::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    S: SessionStore,
{
    type Response = T::Response;
    type Error = T::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let store = self.store.clone();
        let signer = self.signer.clone();
        let config = self.config.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(cookies) = req.extensions().get::<Cookies>().cloned() else {
                tracing::error!("missing cookies request extension");
                return Ok(internal_server_error());
            };

            let session_cookie = cookies.get(&config.name);
            let session_id = session_cookie.as_ref().and_then(|cookie| {
                let session_id = signer.unsign(cookie.value());
                if session_id.is_none() {
                    tracing::debug!(cookie = %config.name, "session cookie failed verification");
                }
                session_id.map(str::to_owned)
            });

            let (origin, payload) = match session_id {
                Some(session_id) => match store.get(&session_id).await {
                    Ok(Some(payload)) => (Origin::Loaded(session_id), payload),
                    Ok(None) => {
                        tracing::debug!(session.id = %session_id, "session not found in store");
                        (Origin::Fresh, Payload::new())
                    }
                    Err(err) => {
                        tracing::error!(err = %err, "failed to load session");
                        return Ok(internal_server_error());
                    }
                },
                None => (Origin::Fresh, Payload::new()),
            };
            let had_cookie = session_cookie.is_some();

            let session = Session::new(payload);
            req.extensions_mut().insert(session.clone());

            let res = inner.call(req).await?;

            if res.status().is_server_error() {
                tracing::debug!(status = %res.status(), "not saving session of failed response");
                return Ok(res);
            }

            let payload = session.to_map();
            let outcome = match Reconcile::plan(&origin, &payload) {
                Reconcile::Create => {
                    let session_id = generate_session_id(config.session_id_length);
                    store
                        .set(&session_id, &payload, config.max_age)
                        .await
                        .map(|()| {
                            tracing::debug!(session.id = %session_id, "created session");
                            cookies.add(config.build_cookie(signer.sign(&session_id)));
                        })
                }
                Reconcile::Nothing => {
                    if had_cookie && config.clear_stale_cookie {
                        cookies.add(config.build_removal_cookie());
                    }
                    Ok(())
                }
                Reconcile::Update(session_id) => store.update(session_id, &payload).await,
                Reconcile::Delete(session_id) => {
                    store.delete(session_id).await.map(|_| {
                        tracing::debug!(session.id = %session_id, "deleted session");
                        cookies.add(config.build_removal_cookie());
                    })
                }
            };

            if let Err(err) = outcome {
                tracing::error!(err = %err, "failed to save session");
                return Ok(internal_server_error());
            }

            Ok(res)
        })
    }
}
