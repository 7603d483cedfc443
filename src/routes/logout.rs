//! POST /logout

use axum::Json;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::SuccessResponse;

/// Destroy the session and evict the cookie.
pub async fn logout(session: SessionHandle) -> Result<Json<SuccessResponse>, AppError> {
    let mut store = session.lock().await;
    store.destroy().await?;
    Ok(Json(SuccessResponse { success: true }))
}
