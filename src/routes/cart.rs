//! POST /cart, DELETE /cart/{index}, DELETE /cart

use axum::Json;
use axum::extract::Path;
use serde_json::Value;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::CartResponse;

pub async fn add_item(
    session: SessionHandle,
    Json(item): Json<Value>,
) -> Result<Json<CartResponse>, AppError> {
    let mut store = session.lock().await;
    let cart = store.add_cart_item(item).await?;
    Ok(Json(CartResponse { cart }))
}

pub async fn remove_item(
    session: SessionHandle,
    Path(index): Path<usize>,
) -> Result<Json<CartResponse>, AppError> {
    let mut store = session.lock().await;
    if store.remove_cart_item(index).await?.is_none() {
        return Err(AppError::NotFound(format!("cart item {index}")));
    }
    Ok(Json(CartResponse {
        cart: store.cart_items(),
    }))
}

pub async fn clear(session: SessionHandle) -> Result<Json<CartResponse>, AppError> {
    let mut store = session.lock().await;
    store.clear_cart().await?;
    Ok(Json(CartResponse { cart: Vec::new() }))
}
