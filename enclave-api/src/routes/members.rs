/// Member-only endpoints
///
/// Everything here sits behind the membership stage gate: the handler
/// re-reads the caller's stage from the database on every request, so a
/// token issued before a demotion or rejection grants nothing.
///
/// # Endpoints
///
/// - `GET /v1/members/directory` - List full members

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use enclave_shared::auth::{gate, middleware::AuthContext};
use enclave_shared::models::user::{MembershipStage, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pagination parameters for the directory
#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    /// Maximum entries to return (default 50, capped at 200)
    pub limit: Option<i64>,

    /// Entries to skip
    pub offset: Option<i64>,
}

/// One directory listing
///
/// Contact details only; password hashes and roles never leave the server.
#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    /// Member's user id
    pub user_id: Uuid,

    /// Username
    pub username: String,

    /// Email address
    pub email: String,

    /// Member since
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// Directory response
#[derive(Debug, Serialize)]
pub struct DirectoryResponse {
    /// Full members
    pub members: Vec<DirectoryEntry>,
}

/// List full members
///
/// # Endpoint
///
/// ```text
/// GET /v1/members/directory?limit=50&offset=0
/// Authorization: Bearer <access token>
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller is not a full member
pub async fn directory(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Json<DirectoryResponse>> {
    gate::require_stage(&state.db, auth.user_id, &[MembershipStage::Member]).await?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let members = User::list_by_stage(&state.db, MembershipStage::Member, limit, offset).await?;

    Ok(Json(DirectoryResponse {
        members: members
            .into_iter()
            .map(|user| DirectoryEntry {
                user_id: user.id,
                username: user.username,
                email: user.email,
                joined_at: user.updated_at,
            })
            .collect(),
    }))
}
