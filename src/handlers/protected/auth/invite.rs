// handlers/protected/auth/invite.rs - invitation issuance and listing

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};

use crate::app::AppState;
use crate::auth::Principal;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::InvitationSummary;
use crate::services::{InviteRequest, IssuedInvitation};

/// POST /auth/invite - issue an invitation and email the link
///
/// Responds 201 even when the email could not be delivered; `emailDelivered`
/// tells the caller to share `inviteLink` by hand.
pub async fn invite_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<InviteRequest>, JsonRejection>,
) -> ApiResult<IssuedInvitation> {
    let Json(request) = payload?;
    let issued = state.invitations.issue(&principal, request).await?;
    Ok(ApiResponse::created(issued))
}

/// GET /auth/invitations - pending invitations, newest first
pub async fn invitations_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<InvitationSummary>> {
    let pending = state.invitations.list_pending(&principal).await?;
    Ok(ApiResponse::success(pending))
}
