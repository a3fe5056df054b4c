/// Post-commit notification queue
///
/// Workflow operations queue notifications while their transaction is still
/// open, then dispatch the queue only after commit. This keeps the side
/// effects out of the transaction's success path entirely: a notification is
/// never sent for a rolled-back decision, and a failed send never undoes a
/// committed one.
///
/// Each notification is attempted up to [`MAX_ATTEMPTS`] times with a short
/// backoff. Terminal failure is logged as a warning (a recoverable delivery
/// problem, distinct from the workflow's own errors) and dropped.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use enclave_shared::notify::{dispatcher::PostCommitQueue, Notifier};
///
/// # async fn example(notifier: Arc<dyn Notifier>) {
/// let mut queue = PostCommitQueue::new();
/// // ... queue.push(notification) while the transaction is open ...
/// // tx.commit().await?;
/// queue.dispatch(notifier.as_ref()).await;
/// # }
/// ```

use std::time::Duration;

use tracing::{debug, warn};

use super::{Notification, Notifier};

/// Attempts per notification before giving up
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles per attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

/// Notifications collected during a workflow operation, dispatched after
/// its transaction commits
#[derive(Debug, Default)]
pub struct PostCommitQueue {
    pending: Vec<Notification>,
}

impl PostCommitQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a notification for post-commit dispatch
    pub fn push(&mut self, notification: Notification) {
        self.pending.push(notification);
    }

    /// Number of queued notifications
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Dispatches every queued notification, consuming the queue
    ///
    /// Never fails: each delivery is retried up to [`MAX_ATTEMPTS`] times
    /// and a terminal failure is logged as a warning. Call this only after
    /// the owning transaction has committed.
    pub async fn dispatch(self, notifier: &dyn Notifier) {
        for notification in self.pending {
            send_with_retry(notifier, &notification).await;
        }
    }
}

/// Sends one notification with bounded retries and exponential backoff
async fn send_with_retry(notifier: &dyn Notifier, notification: &Notification) {
    let mut delay = RETRY_BASE_DELAY;

    for attempt in 1..=MAX_ATTEMPTS {
        match notifier.send(notification).await {
            Ok(receipt) => {
                debug!(
                    template = notification.template.as_str(),
                    recipient = %notification.recipient.user_id,
                    delivery_id = ?receipt.delivery_id,
                    "Notification delivered"
                );
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                debug!(
                    template = notification.template.as_str(),
                    recipient = %notification.recipient.user_id,
                    attempt,
                    error = %e,
                    "Notification delivery failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(
                    template = notification.template.as_str(),
                    recipient = %notification.recipient.user_id,
                    attempts = MAX_ATTEMPTS,
                    error = %e,
                    "Notification delivery failed, giving up"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{DeliveryReceipt, NotificationTemplate, NotifyError, Recipient};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Fake notifier that fails a configurable number of times, then succeeds
    struct FlakyNotifier {
        failures_before_success: u32,
        calls: AtomicU32,
        delivered: Mutex<Vec<NotificationTemplate>>,
    }

    impl FlakyNotifier {
        fn new(failures_before_success: u32) -> Self {
            Self {
                failures_before_success,
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(NotifyError::Transport("connection refused".to_string()));
            }

            self.delivered
                .lock()
                .unwrap()
                .push(notification.template);
            Ok(DeliveryReceipt { delivery_id: None })
        }
    }

    fn sample_notification(template: NotificationTemplate) -> Notification {
        Notification {
            recipient: Recipient {
                user_id: Uuid::new_v4(),
                email: "applicant@example.com".to_string(),
                phone: None,
            },
            template,
            data: json!({ "entry_id": Uuid::new_v4() }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_delivers_everything() {
        let notifier = FlakyNotifier::new(0);

        let mut queue = PostCommitQueue::new();
        queue.push(sample_notification(NotificationTemplate::SubmissionReceived));
        queue.push(sample_notification(NotificationTemplate::NewSubmissionAlert));
        assert_eq!(queue.len(), 2);

        queue.dispatch(&notifier).await;

        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(
            *delivered,
            vec![
                NotificationTemplate::SubmissionReceived,
                NotificationTemplate::NewSubmissionAlert,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_retries_transient_failures() {
        // Fails twice, succeeds on the third (and last) attempt
        let notifier = FlakyNotifier::new(MAX_ATTEMPTS - 1);

        let mut queue = PostCommitQueue::new();
        queue.push(sample_notification(NotificationTemplate::ApplicationApproved));
        queue.dispatch(&notifier).await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_gives_up_after_max_attempts() {
        let notifier = FlakyNotifier::new(u32::MAX);

        let mut queue = PostCommitQueue::new();
        queue.push(sample_notification(NotificationTemplate::ApplicationRejected));

        // Must complete (and not panic or error) despite every attempt failing
        queue.dispatch(&notifier).await;

        assert_eq!(notifier.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
        assert!(notifier.delivered.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let queue = PostCommitQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
