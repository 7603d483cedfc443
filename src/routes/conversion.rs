//! POST /conversion

use axum::Json;
use axum::extract::State;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::signer::RequestOptions;
use crate::types::{ConversionRequest, ConversionResponse};

/// Report an order to the master, attributed to the session's affiliate.
pub async fn conversion(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
    Json(body): Json<ConversionRequest>,
) -> Result<Json<ConversionResponse>, AppError> {
    if body.order_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing order_id".into()));
    }

    // Release the session lock before going to the network.
    let (code, attribution, session_id) = {
        let store = session.lock().await;
        let code = store.affiliate_code().ok_or(AppError::NoAttribution)?;
        (code, store.affiliate(), store.id().map(String::from))
    };

    let mut payload = body.extra;
    payload.insert("event".into(), Value::from("conversion"));
    payload.insert("affiliate_code".into(), Value::from(code));
    payload.insert("order_id".into(), Value::from(body.order_id));
    payload.insert("amount".into(), Value::from(body.amount));
    payload.insert("currency".into(), Value::from(body.currency));
    payload.insert("session_id".into(), Value::from(session_id));
    if let Some(attribution) = attribution {
        payload.insert("attributed_at".into(), Value::from(attribution.timestamp));
        payload.insert("landing_page".into(), Value::from(attribution.landing_page));
        payload.insert("referrer".into(), Value::from(attribution.referrer));
    }

    let resp = state
        .signer
        .post_json(
            &state.config.conversions_url(),
            payload,
            RequestOptions::default(),
        )
        .await;

    let tracked = resp.is_success();
    if !tracked {
        tracing::warn!(
            status = resp.status_code,
            "master did not accept conversion event"
        );
    }

    Ok(Json(ConversionResponse {
        tracked,
        status_code: Some(resp.status_code),
        error: (!tracked).then(|| resp.error.unwrap_or(resp.body)),
    }))
}
