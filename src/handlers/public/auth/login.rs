// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginRequest, LoginResult};

/// POST /auth/login - exchange email + password for a bearer session
///
/// Unknown email, wrong password and inactive accounts all answer 401 with
/// the same message.
pub async fn login_post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResult> {
    let Json(request) = payload?;
    let result = state.sessions.login(request).await?;
    Ok(ApiResponse::success(result))
}
