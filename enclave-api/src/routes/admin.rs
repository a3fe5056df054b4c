/// Application review endpoints
///
/// These endpoints are for the review team. The router requires a valid
/// JWT; the handlers additionally require a role that may decide
/// applications. The workflow re-checks the decider's role against the
/// database inside its transaction, so a stale token never authorizes a
/// demoted admin.
///
/// # Endpoints
///
/// - `GET /v1/admin/applications` - List applications awaiting review
/// - `POST /v1/admin/applications/:id/decide` - Approve or reject one

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use enclave_shared::auth::middleware::AuthContext;
use enclave_shared::models::survey_log::SurveyLogEntry;
use enclave_shared::workflow::Decision;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pagination parameters for the review queue
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Maximum entries to return (default 50, capped at 200)
    pub limit: Option<i64>,

    /// Entries to skip
    pub offset: Option<i64>,
}

/// One entry in the review queue
#[derive(Debug, Serialize)]
pub struct ApplicationSummary {
    /// Survey log entry id
    pub entry_id: Uuid,

    /// The applicant
    pub user_id: Uuid,

    /// Survey answers
    pub answers: serde_json::Value,

    /// Stage the applicant held when they submitted
    pub prior_stage: String,

    /// When the entry was submitted
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// List response
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Pending applications, oldest first
    pub applications: Vec<ApplicationSummary>,
}

/// Decision request
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    /// The verdict
    pub decision: Decision,

    /// Optional remarks recorded with the decision and included in the
    /// notification to the applicant
    pub remarks: Option<String>,
}

/// Decision response
#[derive(Debug, Serialize)]
pub struct DecideResponse {
    /// The decided entry
    pub entry_id: Uuid,

    /// The applicant
    pub user_id: Uuid,

    /// The applicant's stage after the decision
    pub new_stage: String,
}

impl From<SurveyLogEntry> for ApplicationSummary {
    fn from(entry: SurveyLogEntry) -> Self {
        Self {
            entry_id: entry.id,
            user_id: entry.user_id,
            answers: entry.answers,
            prior_stage: entry.prior_stage.as_str().to_string(),
            submitted_at: entry.submitted_at,
        }
    }
}

/// List applications awaiting review
///
/// # Endpoint
///
/// ```text
/// GET /v1/admin/applications?limit=50&offset=0
/// Authorization: Bearer <access token>
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller's role may not review applications
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    if !auth.role.can_decide() {
        return Err(ApiError::Forbidden(
            "Reviewing applications requires an admin role".to_string(),
        ));
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let entries = state.workflow.pending_applications(limit, offset).await?;

    Ok(Json(ListResponse {
        applications: entries.into_iter().map(ApplicationSummary::from).collect(),
    }))
}

/// Decide one application
///
/// Approval advances the applicant to the stage their application targets;
/// rejection makes them eligible to reapply. Either way the entry is
/// closed and the applicant is notified after the transaction commits.
///
/// # Endpoint
///
/// ```text
/// POST /v1/admin/applications/:id/decide
/// Authorization: Bearer <access token>
/// Content-Type: application/json
///
/// {
///   "decision": "approved",
///   "remarks": "Welcome aboard"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: The caller's role may not review applications
/// - `404 Not Found`: No such entry
/// - `409 Conflict`: The entry was already decided
pub async fn decide_application(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<DecideRequest>,
) -> ApiResult<Json<DecideResponse>> {
    if !auth.role.can_decide() {
        return Err(ApiError::Forbidden(
            "Reviewing applications requires an admin role".to_string(),
        ));
    }

    let user = state
        .workflow
        .decide(entry_id, auth.user_id, req.decision, req.remarks)
        .await?;

    Ok(Json(DecideResponse {
        entry_id,
        user_id: user.id,
        new_stage: user.membership_stage.as_str().to_string(),
    }))
}
