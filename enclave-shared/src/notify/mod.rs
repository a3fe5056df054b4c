/// Notification dispatcher contract
///
/// The workflow engine never sends email or SMS itself. It composes
/// [`Notification`] values and hands them to a [`Notifier`] implementation
/// after its transaction commits. The transport (an email/SMS gateway) stays
/// behind the trait; the API server provides an HTTP implementation and
/// tests substitute a recording fake.
///
/// Delivery is fire-and-forget with respect to the workflow transaction: a
/// failed send is retried and ultimately logged as a warning, but it never
/// rolls back or fails the operation that produced it.
///
/// # Modules
///
/// - [`dispatcher`]: the post-commit queue and retrying dispatch loop

pub mod dispatcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message templates the workflow can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// To the applicant: we received your submission
    SubmissionReceived,

    /// To each admin: a new submission awaits review
    NewSubmissionAlert,

    /// To the applicant: your application was approved
    ApplicationApproved,

    /// To the applicant: your application was rejected
    ApplicationRejected,
}

impl NotificationTemplate {
    /// Template name as sent to the delivery gateway
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::SubmissionReceived => "submission_received",
            NotificationTemplate::NewSubmissionAlert => "new_submission_alert",
            NotificationTemplate::ApplicationApproved => "application_approved",
            NotificationTemplate::ApplicationRejected => "application_rejected",
        }
    }
}

/// Who a notification goes to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    /// The user the message is addressed to
    pub user_id: Uuid,

    /// Delivery email address
    pub email: String,

    /// Optional SMS number
    pub phone: Option<String>,
}

/// One message to be delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Addressee
    pub recipient: Recipient,

    /// Which template to render
    pub template: NotificationTemplate,

    /// Template data (decision remarks, entry id, etc.)
    pub data: serde_json::Value,
}

/// Receipt returned by a successful delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Gateway-assigned delivery id, when the transport provides one
    pub delivery_id: Option<String>,
}

/// Error type for delivery attempts
///
/// All variants are recoverable from the workflow's point of view: the
/// dispatcher retries and then logs, it never propagates.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Transport-level failure (connection refused, timeout, 5xx)
    #[error("Delivery transport failed: {0}")]
    Transport(String),

    /// The gateway rejected the message (bad template, bad recipient)
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Delivery seam between the workflow and the outside world
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// concurrently.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notification
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotifyError>;
}
