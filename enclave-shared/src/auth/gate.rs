/// Membership-stage access gate
///
/// Every stage-gated route consults this gate before serving a request. The
/// gate re-reads the caller's `membership_stage` from the database on each
/// check (never from a cache or a token claim), so an approval or rejection
/// takes effect on the very next request. The gate itself never mutates
/// state; all stage transitions come from the workflow engine.
///
/// A denied request always gets an explicit `InsufficientStage` error,
/// never a silent pass-through.
///
/// # Example
///
/// ```no_run
/// use enclave_shared::auth::gate::require_stage;
/// use enclave_shared::models::user::MembershipStage;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// // Members-only resource
/// require_stage(&pool, user_id, &[MembershipStage::Member]).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{MembershipStage, User};

/// Error type for gate checks
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The caller no longer exists
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    /// The caller's stage is outside the resource's allowed set
    #[error("Membership stage {actual} does not grant access (requires one of: {allowed})")]
    InsufficientStage {
        actual: &'static str,
        allowed: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that the user's current stage is in the allowed set
///
/// Reads the latest committed stage from the database.
///
/// # Returns
///
/// The stage that passed the check, so handlers can branch on it without a
/// second read.
///
/// # Errors
///
/// Returns `GateError::InsufficientStage` when the stage is not allowed,
/// `GateError::UserNotFound` when the authenticated user has vanished.
pub async fn require_stage(
    pool: &PgPool,
    user_id: Uuid,
    allowed: &[MembershipStage],
) -> Result<MembershipStage, GateError> {
    let user = User::find_by_id(pool, user_id)
        .await?
        .ok_or(GateError::UserNotFound(user_id))?;

    check_stage(user.membership_stage, allowed)
}

/// Pure allowed-set check, separated from the database read for testability
pub fn check_stage(
    actual: MembershipStage,
    allowed: &[MembershipStage],
) -> Result<MembershipStage, GateError> {
    if allowed.contains(&actual) {
        Ok(actual)
    } else {
        Err(GateError::InsufficientStage {
            actual: actual.as_str(),
            allowed: allowed
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}
