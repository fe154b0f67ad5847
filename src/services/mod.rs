pub mod accounts;
pub mod error;
pub mod inventory;
pub mod invitation;
pub mod session;

use std::future::Future;
use std::time::Duration;

use crate::store::StoreError;

pub use accounts::{AccountProvisioner, NewAccount};
pub use error::{DependencyError, ErrorKind, ServiceError, StateConflict};
pub use inventory::{ConsumeRequest, ConsumeResult, InventoryService};
pub use invitation::{
    InvitationService, InvitationSettings, InviteRequest, IssuedInvitation, SignupRequest,
    SignupResult, VerifiedInvitation,
};
pub use session::{LoginRequest, LoginResult, SessionService};

/// Run one external call under a deadline, naming it for logs and errors.
pub async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, DependencyError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(DependencyError::Store { operation, source }),
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", operation, limit);
            Err(DependencyError::Timeout {
                operation,
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}
