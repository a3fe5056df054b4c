/// Survey log model and database operations
///
/// A `SurveyLogEntry` is the persisted record of one membership application:
/// the submitted answers, the stage the user held when submitting, and the
/// eventual decision. An entry is written once at submission and mutated
/// exactly once (pending -> approved|rejected); after that it is immutable.
///
/// The single legal writer transition is enforced without locks: the decision
/// update is conditional on `approval_status = 'pending'`, so of two racing
/// deciders exactly one affects a row and the other observes zero rows
/// affected.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE survey_log (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     answers JSONB NOT NULL,
///     prior_stage membership_stage NOT NULL,
///     approval_status approval_status NOT NULL DEFAULT 'pending',
///     remarks TEXT,
///     submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     decided_at TIMESTAMPTZ,
///     reviewed_by UUID REFERENCES users(id)
/// );
///
/// CREATE UNIQUE INDEX survey_log_one_pending_per_user
///     ON survey_log (user_id) WHERE approval_status = 'pending';
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::MembershipStage;

/// Decision state of a survey log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Submitted, awaiting a decision
    Pending,

    /// Approved by an admin
    Approved,

    /// Rejected by an admin
    Rejected,
}

impl ApprovalStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// One membership application and its eventual decision
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SurveyLogEntry {
    /// Unique entry ID (UUID v4)
    pub id: Uuid,

    /// The applicant
    pub user_id: Uuid,

    /// Submitted answers (structured key/value payload)
    pub answers: serde_json::Value,

    /// Membership stage the user held when submitting
    ///
    /// Disambiguates first-stage applications from full-membership ones at
    /// decision time.
    pub prior_stage: MembershipStage,

    /// Decision state
    pub approval_status: ApprovalStatus,

    /// Optional remarks recorded by the reviewing admin
    pub remarks: Option<String>,

    /// When the application was submitted
    pub submitted_at: DateTime<Utc>,

    /// When the decision was made (None while pending)
    pub decided_at: Option<DateTime<Utc>>,

    /// The admin who decided (None while pending)
    pub reviewed_by: Option<Uuid>,
}

/// Input for creating a new survey log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSurveyLogEntry {
    /// The applicant
    pub user_id: Uuid,

    /// Submitted answers
    pub answers: serde_json::Value,

    /// Stage the user held at submission
    pub prior_stage: MembershipStage,
}

const ENTRY_COLUMNS: &str = "id, user_id, answers, prior_stage, approval_status, remarks, \
                             submitted_at, decided_at, reviewed_by";

impl SurveyLogEntry {
    /// Creates a new pending entry
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist (foreign key violation),
    /// a pending entry already exists for the user (partial unique index),
    /// or the database connection fails.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateSurveyLogEntry,
    ) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            INSERT INTO survey_log (user_id, answers, prior_stage)
            VALUES ($1, $2, $3)
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(data.user_id)
        .bind(data.answers)
        .bind(data.prior_stage)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }

    /// Finds an entry by ID
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM survey_log
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(entry)
    }

    /// Finds the user's open pending entry, if any
    ///
    /// The partial unique index guarantees there is at most one.
    pub async fn find_pending_by_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM survey_log
            WHERE user_id = $1 AND approval_status = 'pending'
            "#,
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(entry)
    }

    /// Applies a decision to the entry, only if it is still pending
    ///
    /// This is the single legal writer transition for an entry. The update
    /// is conditional on the current status, so a second decision attempt
    /// returns `None` instead of overwriting the first one.
    ///
    /// # Returns
    ///
    /// The decided entry, or `None` if the entry was not in `pending`
    /// status (already decided, or never existed).
    pub async fn decide_if_pending(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        status: ApprovalStatus,
        reviewed_by: Uuid,
        remarks: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            UPDATE survey_log
            SET approval_status = $2,
                reviewed_by = $3,
                remarks = $4,
                decided_at = NOW()
            WHERE id = $1 AND approval_status = 'pending'
            RETURNING {ENTRY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .bind(reviewed_by)
        .bind(remarks)
        .fetch_optional(executor)
        .await?;

        Ok(entry)
    }

    /// Lists pending entries, oldest first, for the admin review queue
    pub async fn list_pending(
        executor: impl PgExecutor<'_>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM survey_log
            WHERE approval_status = 'pending'
            ORDER BY submitted_at ASC
            LIMIT $1 OFFSET $2
            "#,
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    /// Lists all of a user's entries, newest first
    pub async fn list_by_user(
        executor: impl PgExecutor<'_>,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, SurveyLogEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM survey_log
            WHERE user_id = $1
            ORDER BY submitted_at DESC
            "#,
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_status_as_str() {
        assert_eq!(ApprovalStatus::Pending.as_str(), "pending");
        assert_eq!(ApprovalStatus::Approved.as_str(), "approved");
        assert_eq!(ApprovalStatus::Rejected.as_str(), "rejected");
    }

    #[test]
    fn test_approval_status_serde_round_trip() {
        let json = serde_json::to_string(&ApprovalStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");

        let status: ApprovalStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(status, ApprovalStatus::Approved);
    }

    // Integration tests for the conditional decision update are in
    // tests/workflow_tests.rs (they require a running database).
}
