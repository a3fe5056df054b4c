/// Survey submission
///
/// Accepts an applicant's answers, persists the survey log entry, and moves
/// the user's stage to `pending`, both writes in one transaction.

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::survey_log::{CreateSurveyLogEntry, SurveyLogEntry};
use crate::models::user::{MembershipStage, User};
use crate::notify::dispatcher::PostCommitQueue;
use crate::notify::{Notification, NotificationTemplate, Recipient};

use super::{MembershipWorkflow, WorkflowError};

impl MembershipWorkflow {
    /// Submits a membership application
    ///
    /// Preconditions, checked inside the transaction:
    ///
    /// - the user exists
    /// - the answers are a non-empty JSON object
    /// - the user's stage permits a submission (no outstanding pending
    ///   entry, not already a full member)
    ///
    /// The user row is locked (`FOR UPDATE`) for the duration, so two
    /// concurrent submissions from the same user serialize and the second
    /// fails with `DuplicateApplication` instead of racing past the check.
    /// The partial unique index on the survey log backs this up.
    ///
    /// After commit, the applicant gets a `SubmissionReceived` notification
    /// and every decider gets a `NewSubmissionAlert`, fire-and-forget.
    ///
    /// # Errors
    ///
    /// - `UserNotFound`: unknown user id
    /// - `InvalidAnswers`: payload is not a non-empty object
    /// - `DuplicateApplication`: a pending entry already exists
    /// - `StageNotEligible`: the stage forbids submission (e.g. `member`)
    /// - `Persistence`: transactional failure; no partial state remains
    pub async fn submit_application(
        &self,
        user_id: Uuid,
        answers: serde_json::Value,
    ) -> Result<SurveyLogEntry, WorkflowError> {
        let valid = answers.as_object().is_some_and(|m| !m.is_empty());
        if !valid {
            return Err(WorkflowError::InvalidAnswers);
        }

        let mut tx = self.db.begin().await?;

        let user = User::find_by_id_for_update(&mut *tx, user_id)
            .await?
            .ok_or(WorkflowError::UserNotFound(user_id))?;

        if user.membership_stage == MembershipStage::Pending {
            return Err(WorkflowError::DuplicateApplication(user_id));
        }
        if !user.membership_stage.can_submit() {
            return Err(WorkflowError::StageNotEligible(
                user.membership_stage.as_str(),
            ));
        }

        // The stage check above should make this unreachable, but the log
        // is the source of truth for the one-pending-per-user invariant.
        if SurveyLogEntry::find_pending_by_user(&mut *tx, user_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::DuplicateApplication(user_id));
        }

        let entry = SurveyLogEntry::create(
            &mut *tx,
            CreateSurveyLogEntry {
                user_id,
                answers,
                prior_stage: user.membership_stage,
            },
        )
        .await?;

        User::set_stage(&mut *tx, user_id, MembershipStage::Pending)
            .await?
            .ok_or(WorkflowError::UserNotFound(user_id))?;

        let deciders = User::list_deciders(&mut *tx).await?;

        tx.commit().await?;

        info!(
            user_id = %user_id,
            entry_id = %entry.id,
            prior_stage = entry.prior_stage.as_str(),
            "Membership application submitted"
        );

        let mut queue = PostCommitQueue::new();
        queue.push(Notification {
            recipient: Recipient {
                user_id: user.id,
                email: user.email.clone(),
                phone: user.phone.clone(),
            },
            template: NotificationTemplate::SubmissionReceived,
            data: json!({ "entry_id": entry.id }),
        });
        for decider in deciders {
            queue.push(Notification {
                recipient: Recipient {
                    user_id: decider.id,
                    email: decider.email,
                    phone: decider.phone,
                },
                template: NotificationTemplate::NewSubmissionAlert,
                data: json!({
                    "entry_id": entry.id,
                    "applicant": user.username.clone(),
                }),
            });
        }
        self.dispatch_in_background(queue);

        Ok(entry)
    }
}
