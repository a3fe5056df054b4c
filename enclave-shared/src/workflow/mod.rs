/// The membership application/approval engine
///
/// `MembershipWorkflow` is the only writer of membership state: submission
/// moves a user to `pending`, a decision moves them forward (or back to
/// `reapply_eligible`). Both operations apply their multi-row effects inside
/// a single transaction (the survey-log write and the user-stage write
/// commit together or not at all) and queue their notifications for
/// dispatch strictly after commit.
///
/// Dependencies are explicit: the engine is constructed with a database pool
/// and a [`Notifier`] handle, never reached through globals, so tests can
/// hand it a scratch database and a recording fake.
///
/// # Modules
///
/// - [`error`]: the workflow error taxonomy
/// - `submission`: [`MembershipWorkflow::submit_application`]
/// - `approval`: [`MembershipWorkflow::decide`]
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use enclave_shared::notify::Notifier;
/// use enclave_shared::workflow::MembershipWorkflow;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, notifier: Arc<dyn Notifier>) -> anyhow::Result<()> {
/// let workflow = MembershipWorkflow::new(pool, notifier);
/// let status = workflow.status(uuid::Uuid::new_v4()).await?;
/// println!("stage: {}", status.stage.as_str());
/// # Ok(())
/// # }
/// ```

pub mod error;

mod approval;
mod submission;

pub use approval::Decision;
pub use error::WorkflowError;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::survey_log::SurveyLogEntry;
use crate::models::user::{MembershipStage, User};
use crate::notify::dispatcher::PostCommitQueue;
use crate::notify::Notifier;

/// The membership workflow engine
#[derive(Clone)]
pub struct MembershipWorkflow {
    db: PgPool,
    notifier: Arc<dyn Notifier>,
}

/// A user's current position in the pipeline, as reported by `status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipStatus {
    /// The user
    pub user_id: Uuid,

    /// Current membership stage (latest committed value)
    pub stage: MembershipStage,

    /// The open survey log entry, present iff the stage is `pending`
    pub pending_entry_id: Option<Uuid>,
}

impl MembershipWorkflow {
    /// Creates a workflow engine with explicit dependencies
    pub fn new(db: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Reports the user's current membership stage
    ///
    /// Reads the latest committed row. When the stage is `pending`, also
    /// reports the id of the open entry so the client can reference it.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::UserNotFound` for an unknown user.
    pub async fn status(&self, user_id: Uuid) -> Result<MembershipStatus, WorkflowError> {
        let user = User::find_by_id(&self.db, user_id)
            .await?
            .ok_or(WorkflowError::UserNotFound(user_id))?;

        let pending_entry_id = if user.membership_stage == MembershipStage::Pending {
            SurveyLogEntry::find_pending_by_user(&self.db, user_id)
                .await?
                .map(|entry| entry.id)
        } else {
            None
        };

        Ok(MembershipStatus {
            user_id,
            stage: user.membership_stage,
            pending_entry_id,
        })
    }

    /// Lists pending applications, oldest first, for the admin review queue
    pub async fn pending_applications(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SurveyLogEntry>, WorkflowError> {
        Ok(SurveyLogEntry::list_pending(&self.db, limit, offset).await?)
    }

    /// Dispatches a post-commit queue without blocking the caller
    ///
    /// Delivery (with its retries) runs on a background task; the request
    /// that triggered it returns immediately. Failures are logged inside
    /// the dispatcher.
    pub(crate) fn dispatch_in_background(&self, queue: PostCommitQueue) {
        if queue.is_empty() {
            return;
        }

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            queue.dispatch(notifier.as_ref()).await;
        });
    }
}
