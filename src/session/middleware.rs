//! Axum session middleware layer.
//!
//! Builds a `RequestContext` from the inbound request, resolves the session,
//! applies the configured security validation, makes the store available via
//! request extensions, and appends every `Set-Cookie` the store produced to
//! the response.

use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::store::SessionLayer;
use super::{AnyBackend, RequestContext, SessionBackend, SessionStore};
use crate::error::AppError;

/// Shared handle to the request's session, inserted into request extensions.
pub struct SessionHandle<B: SessionBackend = AnyBackend>(pub Arc<Mutex<SessionStore<B>>>);

impl<B: SessionBackend> Clone for SessionHandle<B> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<B: SessionBackend> std::ops::Deref for SessionHandle<B> {
    type Target = Mutex<SessionStore<B>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract SessionHandle from request extensions (put there by session middleware).
impl<S, B> FromRequestParts<S> for SessionHandle<B>
where
    S: Send + Sync,
    B: SessionBackend + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle<B>>()
            .cloned()
            .ok_or(AppError::Internal("Session middleware not configured".into()))
    }
}

/// Axum middleware function for session handling.
pub async fn session_middleware<B: SessionBackend + 'static>(
    layer: Arc<SessionLayer<B>>,
    mut req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = RequestContext::from_request(req.headers(), req.uri(), peer);

    let mut store = match layer.resolve(ctx).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to resolve session: {}", e);
            return AppError::Storage(e.to_string()).into_response();
        }
    };

    if let Err(e) = store.validate_security().await {
        tracing::error!("Failed to destroy rejected session: {}", e);
        return AppError::Storage(e.to_string()).into_response();
    }

    let handle = SessionHandle(Arc::new(Mutex::new(store)));
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let cookies = handle.lock().await.take_cookies();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
        }
    }

    response
}
