/// Delivery gateway notifier implementations
///
/// Two implementations of the shared [`Notifier`] trait:
///
/// - [`HttpNotifier`]: posts deliveries to an external email/SMS gateway
/// - [`LogNotifier`]: logs deliveries instead of sending them, used when
///   no gateway is configured (local development, CI)
///
/// Which one the server uses is decided once at startup from
/// `NOTIFY_GATEWAY_URL`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use enclave_shared::notify::{DeliveryReceipt, Notification, Notifier, NotifyError};

use crate::config::NotifyConfig;

/// Request timeout for a single delivery attempt
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload posted to the gateway's delivery endpoint
#[derive(Debug, Serialize)]
struct DeliveryRequest<'a> {
    template: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    data: &'a serde_json::Value,
}

/// Response body from a successful gateway delivery
#[derive(Debug, serde::Deserialize)]
struct DeliveryResponse {
    #[serde(default)]
    delivery_id: Option<String>,
}

/// Notifier that posts deliveries to an HTTP gateway
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpNotifier {
    /// Creates a notifier for the given gateway base URL
    pub fn new(gateway_url: &str, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: format!("{}/deliveries", gateway_url.trim_end_matches('/')),
            token,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotifyError> {
        let payload = DeliveryRequest {
            template: notification.template.as_str(),
            email: &notification.recipient.email,
            phone: notification.recipient.phone.as_deref(),
            data: &notification.data,
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            // The gateway understood us and said no; retrying won't help
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(NotifyError::Transport(format!("gateway returned {}", status)));
        }

        let body: DeliveryResponse = response
            .json()
            .await
            .unwrap_or(DeliveryResponse { delivery_id: None });

        debug!(
            template = notification.template.as_str(),
            user_id = %notification.recipient.user_id,
            delivery_id = ?body.delivery_id,
            "Delivery accepted by gateway"
        );

        Ok(DeliveryReceipt {
            delivery_id: body.delivery_id,
        })
    }
}

/// Notifier that logs deliveries instead of sending them
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<DeliveryReceipt, NotifyError> {
        info!(
            template = notification.template.as_str(),
            user_id = %notification.recipient.user_id,
            email = %notification.recipient.email,
            "Notification (no gateway configured, logging only)"
        );
        Ok(DeliveryReceipt { delivery_id: None })
    }
}

/// Builds the notifier the server will use, from configuration
pub fn build_notifier(config: &NotifyConfig) -> std::sync::Arc<dyn Notifier> {
    match &config.gateway_url {
        Some(url) => {
            info!(gateway = %url, "Using HTTP delivery gateway");
            std::sync::Arc::new(HttpNotifier::new(url, config.gateway_token.clone()))
        }
        None => {
            info!("NOTIFY_GATEWAY_URL not set, deliveries will be logged only");
            std::sync::Arc::new(LogNotifier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_shared::notify::{NotificationTemplate, Recipient};
    use serde_json::json;
    use uuid::Uuid;

    fn sample_notification() -> Notification {
        Notification {
            recipient: Recipient {
                user_id: Uuid::new_v4(),
                email: "applicant@example.com".to_string(),
                phone: None,
            },
            template: NotificationTemplate::SubmissionReceived,
            data: json!({ "entry_id": Uuid::new_v4() }),
        }
    }

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let notifier = HttpNotifier::new("https://gateway.example.com/", None);
        assert_eq!(notifier.endpoint, "https://gateway.example.com/deliveries");

        let notifier = HttpNotifier::new("https://gateway.example.com", None);
        assert_eq!(notifier.endpoint, "https://gateway.example.com/deliveries");
    }

    #[test]
    fn test_delivery_request_omits_missing_phone() {
        let notification = sample_notification();
        let payload = DeliveryRequest {
            template: notification.template.as_str(),
            email: &notification.recipient.email,
            phone: None,
            data: &notification.data,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("phone").is_none());
        assert_eq!(json["template"], "submission_received");
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        let receipt = notifier.send(&sample_notification()).await.unwrap();
        assert!(receipt.delivery_id.is_none());
    }
}
