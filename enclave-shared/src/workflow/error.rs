/// Error taxonomy for the membership workflow
///
/// The variants split along the lines the HTTP layer cares about:
///
/// - not found: `UserNotFound`, `SurveyNotFound`
/// - conflict: `DuplicateApplication`, `AlreadyDecided`
/// - authorization: `UnauthorizedDecider`, `StageNotEligible`
/// - validation: `InvalidAnswers`
/// - persistence: `Persistence` (logged server-side, surfaced generically)
///
/// Delivery failures are deliberately absent: the notification dispatcher
/// logs them as warnings and they never reach the caller.

use uuid::Uuid;

/// Error type for workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The referenced user does not exist
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    /// The referenced survey log entry does not exist
    #[error("Survey log entry {0} not found")]
    SurveyNotFound(Uuid),

    /// The user already has an outstanding pending application
    #[error("User {0} already has a pending application")]
    DuplicateApplication(Uuid),

    /// The entry was already decided; decisions are not reversible here
    #[error("Survey log entry {0} has already been decided")]
    AlreadyDecided(Uuid),

    /// The caller does not hold a role that may decide applications
    #[error("User {0} is not authorized to decide applications")]
    UnauthorizedDecider(Uuid),

    /// The user's current stage does not permit a submission
    #[error("Membership stage {0} does not permit a new application")]
    StageNotEligible(&'static str),

    /// The submitted answers are not a non-empty structured payload
    #[error("Survey answers must be a non-empty object")]
    InvalidAnswers,

    /// Transactional failure; details stay server-side
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let id = Uuid::new_v4();

        assert!(WorkflowError::UserNotFound(id).to_string().contains(&id.to_string()));
        assert!(WorkflowError::AlreadyDecided(id).to_string().contains("already been decided"));
        assert!(WorkflowError::StageNotEligible("member")
            .to_string()
            .contains("member"));
    }
}
