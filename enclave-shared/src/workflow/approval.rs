/// Application decisions
///
/// An admin approves or rejects a pending entry. The entry update and the
/// user's stage advance happen in one transaction; a racing second decider
/// loses the conditional update and gets `AlreadyDecided`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::models::survey_log::{ApprovalStatus, SurveyLogEntry};
use crate::models::user::{MembershipStage, User};
use crate::notify::dispatcher::PostCommitQueue;
use crate::notify::{Notification, NotificationTemplate, Recipient};

use super::{MembershipWorkflow, WorkflowError};

/// An admin's verdict on an application
///
/// Deliberately narrower than [`ApprovalStatus`]: `pending` is a state an
/// entry can be in, not a decision an admin can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Approve the application
    Approved,

    /// Reject the application
    Rejected,
}

impl Decision {
    /// The entry status this decision writes
    pub fn approval_status(&self) -> ApprovalStatus {
        match self {
            Decision::Approved => ApprovalStatus::Approved,
            Decision::Rejected => ApprovalStatus::Rejected,
        }
    }

    /// The stage the applicant lands on
    ///
    /// Approval advances relative to the stage held at submission: a
    /// first-stage application lands on `pre_member`, a pre-member's
    /// full-membership application lands on `member`. Rejection always
    /// lands on `reapply_eligible` so the gate can offer a fresh
    /// submission rather than a stuck pending one.
    pub fn next_stage(&self, prior_stage: MembershipStage) -> MembershipStage {
        match self {
            Decision::Approved => prior_stage.approval_target(),
            Decision::Rejected => MembershipStage::ReapplyEligible,
        }
    }

    /// The notification template for this decision
    pub fn template(&self) -> NotificationTemplate {
        match self {
            Decision::Approved => NotificationTemplate::ApplicationApproved,
            Decision::Rejected => NotificationTemplate::ApplicationRejected,
        }
    }
}

impl MembershipWorkflow {
    /// Decides a pending application
    ///
    /// The decision is applied with a conditional update (`WHERE
    /// approval_status = 'pending'`): of two simultaneous deciders exactly
    /// one wins, the other fails with `AlreadyDecided` and the applicant's
    /// stage reflects only the first decision. Decisions are not
    /// reversible through this operation.
    ///
    /// After commit the applicant is notified of the outcome,
    /// fire-and-forget; a delivery failure never rolls back the committed
    /// decision.
    ///
    /// # Errors
    ///
    /// - `UnauthorizedDecider`: `admin_id` does not resolve to a user whose
    ///   role may decide (the entry is left untouched)
    /// - `SurveyNotFound`: no such entry
    /// - `AlreadyDecided`: the entry is no longer pending
    /// - `Persistence`: transactional failure; no partial state remains
    pub async fn decide(
        &self,
        survey_log_id: Uuid,
        admin_id: Uuid,
        decision: Decision,
        remarks: Option<String>,
    ) -> Result<User, WorkflowError> {
        let mut tx = self.db.begin().await?;

        let admin = User::find_by_id(&mut *tx, admin_id)
            .await?
            .ok_or(WorkflowError::UnauthorizedDecider(admin_id))?;
        if !admin.role.can_decide() {
            return Err(WorkflowError::UnauthorizedDecider(admin_id));
        }

        let entry = match SurveyLogEntry::decide_if_pending(
            &mut *tx,
            survey_log_id,
            decision.approval_status(),
            admin_id,
            remarks.as_deref(),
        )
        .await?
        {
            Some(entry) => entry,
            // Zero rows affected: either the entry never existed or someone
            // else decided it first.
            None => {
                return match SurveyLogEntry::find_by_id(&mut *tx, survey_log_id).await? {
                    Some(_) => Err(WorkflowError::AlreadyDecided(survey_log_id)),
                    None => Err(WorkflowError::SurveyNotFound(survey_log_id)),
                };
            }
        };

        let next_stage = decision.next_stage(entry.prior_stage);
        let user = User::set_stage(&mut *tx, entry.user_id, next_stage)
            .await?
            .ok_or(WorkflowError::UserNotFound(entry.user_id))?;

        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            applicant = %user.id,
            admin = %admin_id,
            decision = decision.approval_status().as_str(),
            next_stage = next_stage.as_str(),
            "Application decided"
        );

        let mut queue = PostCommitQueue::new();
        queue.push(Notification {
            recipient: Recipient {
                user_id: user.id,
                email: user.email.clone(),
                phone: user.phone.clone(),
            },
            template: decision.template(),
            data: json!({
                "entry_id": entry.id,
                "stage": next_stage,
                "remarks": remarks,
            }),
        });
        self.dispatch_in_background(queue);

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_maps_to_approval_status() {
        assert_eq!(Decision::Approved.approval_status(), ApprovalStatus::Approved);
        assert_eq!(Decision::Rejected.approval_status(), ApprovalStatus::Rejected);
    }

    #[test]
    fn test_approval_advances_relative_to_prior_stage() {
        // First-stage application
        assert_eq!(
            Decision::Approved.next_stage(MembershipStage::Applicant),
            MembershipStage::PreMember
        );
        assert_eq!(
            Decision::Approved.next_stage(MembershipStage::ReapplyEligible),
            MembershipStage::PreMember
        );

        // Full-membership round
        assert_eq!(
            Decision::Approved.next_stage(MembershipStage::PreMember),
            MembershipStage::Member
        );
    }

    #[test]
    fn test_approval_strictly_advances_rank() {
        for prior in [
            MembershipStage::None,
            MembershipStage::Applicant,
            MembershipStage::ReapplyEligible,
            MembershipStage::PreMember,
        ] {
            let next = Decision::Approved.next_stage(prior);
            assert!(
                next.rank() > prior.rank(),
                "approval from {:?} must advance the pipeline",
                prior
            );
        }
    }

    #[test]
    fn test_rejection_always_lands_on_reapply_eligible() {
        for prior in [
            MembershipStage::None,
            MembershipStage::Applicant,
            MembershipStage::ReapplyEligible,
            MembershipStage::PreMember,
        ] {
            assert_eq!(
                Decision::Rejected.next_stage(prior),
                MembershipStage::ReapplyEligible
            );
        }

        // And reapply_eligible permits a fresh submission
        assert!(MembershipStage::ReapplyEligible.can_submit());
    }

    #[test]
    fn test_decision_templates() {
        assert_eq!(
            Decision::Approved.template(),
            NotificationTemplate::ApplicationApproved
        );
        assert_eq!(
            Decision::Rejected.template(),
            NotificationTemplate::ApplicationRejected
        );
    }
}
