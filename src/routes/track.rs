//! GET /track?ref=CODE

use axum::Json;
use axum::extract::Query;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::TrackResponse;

const MAX_CODE_LEN: usize = 64;

/// Capture the affiliate code from the landing URL. Every other query pair
/// is kept as a source field of the attribution.
pub async fn track(
    session: SessionHandle,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> Result<Json<TrackResponse>, AppError> {
    let code = params
        .remove("ref")
        .ok_or_else(|| AppError::BadRequest("Missing ref parameter".into()))?;
    if !is_valid_code(&code) {
        return Err(AppError::BadRequest("Invalid affiliate code".into()));
    }

    let source: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    let mut store = session.lock().await;
    let attribution = store.set_affiliate(&code, source).await?;

    Ok(Json(TrackResponse {
        affiliate_code: attribution.code,
    }))
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}
