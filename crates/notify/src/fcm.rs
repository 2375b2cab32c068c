//! Firebase Cloud Messaging (HTTP v1) notifier.

use async_trait::async_trait;
use myplant_core::error::NotifyError;
use myplant_core::notify::{Notifier, PushMessage, PushTarget};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Sends pushes through `projects/{project}/messages:send`.
pub struct FcmNotifier {
    base_url: String,
    project_id: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl FcmNotifier {
    pub fn new(project_id: impl Into<String>, access_token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: "https://fcm.googleapis.com/v1".into(),
            project_id: project_id.into(),
            access_token,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The `{"message": ...}` envelope FCM expects.
    pub fn request_body(message: &PushMessage) -> Value {
        let mut body = json!({
            "notification": {
                "title": message.notification.title,
                "body": message.notification.body,
            }
        });

        match &message.target {
            PushTarget::Topic(topic) => body["topic"] = json!(topic),
            PushTarget::Condition(condition) => body["condition"] = json!(condition),
        }

        if !message.data.is_empty() {
            body["data"] = json!(message.data);
        }

        json!({ "message": body })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    name: String,
}

#[async_trait]
impl Notifier for FcmNotifier {
    fn name(&self) -> &str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage) -> Result<String, NotifyError> {
        if self.project_id.is_empty() {
            return Err(NotifyError::NotConfigured("notify.project_id is not set".into()));
        }

        let url = format!("{}/projects/{}/messages:send", self.base_url, self.project_id);
        debug!(target = %message.target, "Sending FCM message");

        let mut request = self.client.post(&url).json(&Self::request_body(message));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), target = %message.target, "FCM rejected message");
            return Err(NotifyError::DeliveryFailed {
                target: message.target.to_string(),
                reason: format!("HTTP {}: {body}", status.as_u16()),
            });
        }

        let sent: SendResponse = response.json().await.map_err(|e| NotifyError::DeliveryFailed {
            target: message.target.to_string(),
            reason: format!("Failed to parse response: {e}"),
        })?;
        Ok(sent.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use std::collections::BTreeMap;

    async fn serve(app: Router) -> FcmNotifier {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        FcmNotifier::new("demo", Some("token".into())).with_base_url(format!("http://{addr}/v1"))
    }

    #[test]
    fn topic_body_with_data() {
        let mut data = BTreeMap::new();
        data.insert("eventId".to_string(), "e1".to_string());
        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "ALERT from a", "dry")
            .with_data(data);

        let body = FcmNotifier::request_body(&msg);
        assert_eq!(body["message"]["topic"], "admins");
        assert_eq!(body["message"]["notification"]["title"], "ALERT from a");
        assert_eq!(body["message"]["data"]["eventId"], "e1");
        assert!(body["message"].get("condition").is_none());
    }

    #[test]
    fn condition_body_without_data() {
        let msg = PushMessage::new(PushTarget::condition_for_topic("admins"), "t", "b");
        let body = FcmNotifier::request_body(&msg);
        assert_eq!(body["message"]["condition"], "'admins' in topics");
        assert!(body["message"].get("data").is_none());
        assert!(body["message"].get("topic").is_none());
    }

    #[tokio::test]
    async fn returns_message_name() {
        let app = Router::new().route(
            "/v1/projects/demo/messages:send",
            post(|| async { axum::Json(json!({"name": "projects/demo/messages/0:123"})) }),
        );
        let notifier = serve(app).await;

        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "t", "b");
        assert_eq!(notifier.send(&msg).await.unwrap(), "projects/demo/messages/0:123");
    }

    #[tokio::test]
    async fn rejection_is_delivery_failure() {
        let app = Router::new().route(
            "/v1/projects/demo/messages:send",
            post(|| async { (StatusCode::NOT_FOUND, "Requested entity was not found.").into_response() }),
        );
        let notifier = serve(app).await;

        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "t", "b");
        let err = notifier.send(&msg).await.unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed { ref reason, .. } if reason.contains("404")));
    }

    #[tokio::test]
    async fn missing_project_is_not_configured() {
        let notifier = FcmNotifier::new("", None);
        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "t", "b");
        assert!(matches!(notifier.send(&msg).await, Err(NotifyError::NotConfigured(_))));
    }
}
