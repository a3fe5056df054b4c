/// User model and database operations
///
/// A user carries two independent axes of state:
///
/// - `role`: the authorization level (guest/user/admin/super_admin)
/// - `membership_stage`: progress through the application pipeline
///
/// The stage only ever moves through the defined sequence; it is mutated
/// exclusively by the workflow engine (submission sets `pending`, a decision
/// sets `pre_member`/`member` or `reapply_eligible`). Nothing in this module
/// enforces the sequence on its own; the workflow does, inside its
/// transactions.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(64) NOT NULL UNIQUE,
///     email CITEXT NOT NULL UNIQUE,
///     phone VARCHAR(32),
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     membership_stage membership_stage NOT NULL DEFAULT 'applicant',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Authorization level, independent of membership stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unauthenticated or throwaway account
    Guest,

    /// Regular registered user
    User,

    /// Can review and decide membership applications
    Admin,

    /// Admin plus account administration
    SuperAdmin,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Whether this role may decide membership applications
    pub fn can_decide(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// Progress through the membership application pipeline
///
/// The legal sequence is:
///
/// ```text
/// none -> applicant -> pending -> { pre_member, reapply_eligible }
///                         ^                |
///                         +--- (reapply) --+
/// pre_member -> pending -> member
/// ```
///
/// `member` is terminal for this workflow. A stage never skips forward: the
/// only way from `applicant` to `member` runs through `pending` twice (one
/// first-stage approval, one full-membership approval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_stage", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MembershipStage {
    /// No relationship to the membership pipeline
    None,

    /// Registered but has not submitted the survey yet
    Applicant,

    /// Has an outstanding, undecided survey submission
    Pending,

    /// Passed first-stage approval, short of full membership
    PreMember,

    /// Rejected; may submit a fresh application
    ReapplyEligible,

    /// Full member (terminal for this workflow)
    Member,
}

impl MembershipStage {
    /// Converts stage to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStage::None => "none",
            MembershipStage::Applicant => "applicant",
            MembershipStage::Pending => "pending",
            MembershipStage::PreMember => "pre_member",
            MembershipStage::ReapplyEligible => "reapply_eligible",
            MembershipStage::Member => "member",
        }
    }

    /// Position in the pipeline sequence, for "strictly advanced" checks
    ///
    /// `reapply_eligible` ranks with `applicant`: a rejected applicant is
    /// back at the start of the pipeline, not ahead of a pending one.
    pub fn rank(&self) -> u8 {
        match self {
            MembershipStage::None => 0,
            MembershipStage::Applicant => 1,
            MembershipStage::ReapplyEligible => 1,
            MembershipStage::Pending => 2,
            MembershipStage::PreMember => 3,
            MembershipStage::Member => 4,
        }
    }

    /// Whether a user at this stage may submit a survey
    ///
    /// Pre-members may submit again to apply for full membership. A user
    /// with an outstanding submission (`pending`) may not, and a full
    /// member has nothing left to apply for.
    pub fn can_submit(&self) -> bool {
        match self {
            MembershipStage::None
            | MembershipStage::Applicant
            | MembershipStage::ReapplyEligible
            | MembershipStage::PreMember => true,
            MembershipStage::Pending | MembershipStage::Member => false,
        }
    }

    /// Stage granted when an application submitted from this stage is approved
    ///
    /// A pre-member's application is the full-membership round; anything
    /// else is a first-stage application.
    pub fn approval_target(&self) -> MembershipStage {
        match self {
            MembershipStage::PreMember => MembershipStage::Member,
            _ => MembershipStage::PreMember,
        }
    }
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Unique username
    pub username: String,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Optional phone number, used only for notification delivery
    pub phone: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// Authorization level
    pub role: Role,

    /// Progress through the application pipeline
    pub membership_stage: MembershipStage,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
///
/// New accounts start at role `user` and stage `applicant` (database
/// defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Unique username
    pub username: String,

    /// Email address
    pub email: String,

    /// Optional phone number
    pub phone: Option<String>,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email already exists (unique
    /// constraint violation) or the database is unreachable.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, phone, password_hash, role,
                      membership_stage, created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.password_hash)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, phone, password_hash, role,
                   membership_stage, created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID and locks the row for the current transaction
    ///
    /// Used by the workflow engine so that two concurrent submissions from
    /// the same user serialize on the user row instead of both passing the
    /// duplicate-pending check.
    pub async fn find_by_id_for_update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, phone, password_hash, role,
                   membership_stage, created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive via CITEXT)
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_email(
        executor: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, phone, password_hash, role,
                   membership_stage, created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Sets a user's membership stage
    ///
    /// Only the workflow engine calls this, and always inside the same
    /// transaction as the survey-log write it belongs to.
    ///
    /// # Returns
    ///
    /// The updated user, or None if the user doesn't exist
    pub async fn set_stage(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        stage: MembershipStage,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET membership_stage = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, email, phone, password_hash, role,
                      membership_stage, created_at, updated_at, last_login_at
            "#,
        )
        .bind(id)
        .bind(stage)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Updates the last login timestamp, called after successful
    /// authentication
    pub async fn update_last_login(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users at a given membership stage with pagination
    ///
    /// Backs the members directory (`stage = member`) and admin views.
    pub async fn list_by_stage(
        executor: impl PgExecutor<'_>,
        stage: MembershipStage,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, phone, password_hash, role,
                   membership_stage, created_at, updated_at, last_login_at
            FROM users
            WHERE membership_stage = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(stage)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    /// Lists users who may decide applications (admins and super admins)
    ///
    /// Used by the workflow to fan out new-submission alerts.
    pub async fn list_deciders(executor: impl PgExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, phone, password_hash, role,
                   membership_stage, created_at, updated_at, last_login_at
            FROM users
            WHERE role IN ('admin', 'super_admin')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::Guest.as_str(), "guest");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::SuperAdmin.as_str(), "super_admin");
    }

    #[test]
    fn test_role_can_decide() {
        assert!(!Role::Guest.can_decide());
        assert!(!Role::User.can_decide());
        assert!(Role::Admin.can_decide());
        assert!(Role::SuperAdmin.can_decide());
    }

    #[test]
    fn test_stage_rank_is_monotone_along_the_pipeline() {
        assert!(MembershipStage::None.rank() < MembershipStage::Applicant.rank());
        assert!(MembershipStage::Applicant.rank() < MembershipStage::Pending.rank());
        assert!(MembershipStage::Pending.rank() < MembershipStage::PreMember.rank());
        assert!(MembershipStage::PreMember.rank() < MembershipStage::Member.rank());

        // A rejection puts the user back at the start, not ahead of pending
        assert_eq!(
            MembershipStage::ReapplyEligible.rank(),
            MembershipStage::Applicant.rank()
        );
    }

    #[test]
    fn test_stage_can_submit() {
        assert!(MembershipStage::None.can_submit());
        assert!(MembershipStage::Applicant.can_submit());
        assert!(MembershipStage::ReapplyEligible.can_submit());
        assert!(MembershipStage::PreMember.can_submit());

        // Outstanding submission or full membership blocks a new one
        assert!(!MembershipStage::Pending.can_submit());
        assert!(!MembershipStage::Member.can_submit());
    }

    #[test]
    fn test_approval_target() {
        // First-stage approvals land on pre_member
        assert_eq!(
            MembershipStage::Applicant.approval_target(),
            MembershipStage::PreMember
        );
        assert_eq!(
            MembershipStage::ReapplyEligible.approval_target(),
            MembershipStage::PreMember
        );
        assert_eq!(
            MembershipStage::None.approval_target(),
            MembershipStage::PreMember
        );

        // A pre-member's application is the full-membership round
        assert_eq!(
            MembershipStage::PreMember.approval_target(),
            MembershipStage::Member
        );
    }

    #[test]
    fn test_stage_serde_uses_snake_case() {
        let json = serde_json::to_string(&MembershipStage::ReapplyEligible).unwrap();
        assert_eq!(json, "\"reapply_eligible\"");

        let stage: MembershipStage = serde_json::from_str("\"pre_member\"").unwrap();
        assert_eq!(stage, MembershipStage::PreMember);
    }
}
