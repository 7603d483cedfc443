//! POST /session/regenerate

use axum::Json;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::RegenerateResponse;

/// Move the session to a fresh identifier. The host calls this right after
/// a visitor authenticates.
pub async fn regenerate(session: SessionHandle) -> Result<Json<RegenerateResponse>, AppError> {
    let mut store = session.lock().await;
    let session_id = store.rotate().await?;
    Ok(Json(RegenerateResponse { session_id }))
}
