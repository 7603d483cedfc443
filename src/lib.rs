//! AFFCD satellite — signed calls to the master service and the per-visitor
//! session store behind affiliate attribution.
//!
//! Same Axum router runs in both Lambda and local dev contexts.
//! Detection via `AWS_LAMBDA_RUNTIME_API` env var.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod routes;
pub mod session;
pub mod signer;
pub mod types;

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::session::AnyBackend;
use crate::session::middleware::session_middleware;
use crate::session::store::SessionLayer;
use crate::signer::Signer;

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub signer: Signer,
    pub session_layer: Arc<SessionLayer<AnyBackend>>,
}

/// Build the Axum router with session middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let session_layer = state.session_layer.clone();

    let session_routes = Router::new()
        .route("/track", get(routes::track::track))
        .route("/session", get(routes::session::session_summary))
        .route(
            "/session/regenerate",
            post(routes::regenerate::regenerate),
        )
        .route("/cart", post(routes::cart::add_item).delete(routes::cart::clear))
        .route("/cart/{index}", delete(routes::cart::remove_item))
        .route("/logout", post(routes::logout::logout))
        .route("/conversion", post(routes::conversion::conversion))
        .layer(from_fn(move |req, next| {
            let layer = session_layer.clone();
            session_middleware(layer, req, next)
        }));

    // Health checks stay outside the session layer so probes never mint cookies.
    Router::new()
        .route("/health", get(routes::health::health))
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
