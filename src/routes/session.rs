//! GET /session

use axum::Json;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::SessionSummary;

/// Summarize the visitor's session. Pending flash messages are drained.
pub async fn session_summary(session: SessionHandle) -> Result<Json<SessionSummary>, AppError> {
    let mut store = session.lock().await;
    let flash = store.take_flash().await?;

    Ok(Json(SessionSummary {
        session_id: store.id().map(String::from),
        affiliate_code: store.affiliate_code(),
        cart_count: store.cart_items().len(),
        flash,
    }))
}
