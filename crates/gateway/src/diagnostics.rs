//! Smoke-test callables: a test push and a ping.

use chrono::{DateTime, SecondsFormat, Utc};
use myplant_core::notify::{Notifier, PushMessage, PushTarget};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// `testFCM` output. Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestNotifyReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// `helloWorld` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingReply {
    pub message: String,
    pub timestamp: String,
    pub status: String,
}

pub struct Diagnostics {
    notifier: Arc<dyn Notifier>,
    topic: String,
}

impl Diagnostics {
    pub fn new(notifier: Arc<dyn Notifier>, topic: impl Into<String>) -> Self {
        Self {
            notifier,
            topic: topic.into(),
        }
    }

    /// Send a fixed test push to the broadcast topic.
    pub async fn test_notify(&self) -> TestNotifyReply {
        let push = PushMessage::new(
            PushTarget::Topic(self.topic.clone()),
            "Test Notification",
            "This is a test message from the myPlant backend",
        );

        match self.notifier.send(&push).await {
            Ok(id) => {
                info!(notifier = self.notifier.name(), id = %id, "Test notification sent");
                TestNotifyReply {
                    success: true,
                    message: Some("Test notification sent successfully!".into()),
                    response: Some(id),
                    error: None,
                    details: None,
                }
            }
            Err(e) => {
                error!(notifier = self.notifier.name(), error = %e, "Test notification failed");
                TestNotifyReply {
                    success: false,
                    message: None,
                    response: None,
                    error: Some(e.to_string()),
                    details: Some(format!(
                        "Make sure FCM is enabled and devices are subscribed to '{}' topic",
                        self.topic
                    )),
                }
            }
        }
    }

    pub fn ping(&self) -> PingReply {
        ping_at(Utc::now())
    }
}

pub fn ping_at(now: DateTime<Utc>) -> PingReply {
    PingReply {
        message: "Hello from myPlant backend!".into(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        status: "working".into(),
    }
}
