// handlers/protected/inventory/consume.rs - POST /inventory/consume handler

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use crate::app::AppState;
use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ConsumeRequest, ConsumeResult};

/// Take stock out of an item. All or nothing: a short item answers 400
/// `INSUFFICIENT_STOCK` with `{ available, requested }` and is left untouched.
pub async fn consume_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ConsumeRequest>, JsonRejection>,
) -> ApiResult<ConsumeResult> {
    let Json(request) = payload?;
    let result = state.inventory.consume(&principal, request).await?;
    Ok(ApiResponse::success(result))
}
