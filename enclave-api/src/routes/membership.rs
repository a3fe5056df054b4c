/// Applicant-facing membership endpoints
///
/// # Endpoints
///
/// - `POST /v1/membership/apply` - Submit a membership application survey
/// - `GET /v1/membership/status` - Report the caller's membership stage

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Extension, Json};
use enclave_shared::auth::middleware::AuthContext;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application submission request
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    /// Survey answers as a JSON object; must be non-empty
    pub answers: serde_json::Value,
}

/// Application submission response
#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    /// The created survey log entry
    pub entry_id: Uuid,

    /// Entry state, always `pending` right after submission
    pub approval_status: String,

    /// When the entry was submitted
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// Membership status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// The caller's user id
    pub user_id: Uuid,

    /// Current membership stage
    pub stage: String,

    /// The open entry awaiting review, when the stage is `pending`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_entry_id: Option<Uuid>,
}

/// Submit a membership application
///
/// Records the survey answers, moves the caller to the `pending` stage and
/// queues notifications to the applicant and the review team. A caller with
/// an open application gets a conflict instead of a second entry.
///
/// # Endpoint
///
/// ```text
/// POST /v1/membership/apply
/// Authorization: Bearer <access token>
/// Content-Type: application/json
///
/// {
///   "answers": { "why": "I want to join", "referrer": "maria" }
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller's stage has nothing to apply for
/// - `409 Conflict`: An application is already awaiting review
/// - `422 Unprocessable Entity`: Answers are empty or not a JSON object
pub async fn apply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<(StatusCode, Json<ApplyResponse>)> {
    let entry = state
        .workflow
        .submit_application(auth.user_id, req.answers)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApplyResponse {
            entry_id: entry.id,
            approval_status: entry.approval_status.as_str().to_string(),
            submitted_at: entry.submitted_at,
        }),
    ))
}

/// Report the caller's membership status
///
/// # Endpoint
///
/// ```text
/// GET /v1/membership/status
/// Authorization: Bearer <access token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user_id": "uuid",
///   "stage": "pending",
///   "pending_entry_id": "uuid"
/// }
/// ```
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.workflow.status(auth.user_id).await?;

    Ok(Json(StatusResponse {
        user_id: status.user_id,
        stage: status.stage.as_str().to_string(),
        pending_entry_id: status.pending_entry_id,
    }))
}
