// handlers/protected/auth/whoami.rs - GET /auth/me handler

use axum::Extension;

use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn me_get(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    Ok(ApiResponse::success(principal))
}
