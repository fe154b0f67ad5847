// handlers/public/auth/invitation.rs - invitation verification and redemption

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{SignupRequest, SignupResult, VerifiedInvitation};

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(default)]
    pub token: String,
}

/// GET /auth/verify-invitation?token=... - read-only redeemability check
///
/// Answers `{ email, role, expires_at }` so the signup page can prefill.
pub async fn verify_invitation_get(
    State(state): State<AppState>,
    params: Result<Query<VerifyParams>, QueryRejection>,
) -> ApiResult<VerifiedInvitation> {
    let Query(params) = params?;
    let verified = state.invitations.verify(&params.token).await?;
    Ok(ApiResponse::success(verified))
}

/// POST /auth/signup - redeem an invitation and create the account
///
/// The session is best-effort: `session` is null if automatic sign-in failed,
/// and the client should fall back to the login page.
pub async fn signup_post(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<SignupResult> {
    let Json(request) = payload?;
    let result = state.invitations.redeem(request).await?;
    Ok(ApiResponse::success(result))
}
