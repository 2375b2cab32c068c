//! Notifier trait: the abstraction over push-notification services.
//!
//! A Notifier delivers one message to every subscriber of a broadcast topic
//! (or of a topic condition expression) and returns the service's delivery id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::NotifyError;

/// Who receives a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTarget {
    /// A named broadcast topic, e.g. `admins`.
    Topic(String),
    /// A topic condition expression, e.g. `'admins' in topics`.
    Condition(String),
}

impl PushTarget {
    /// Condition expression matching every subscriber of `topic`.
    pub fn condition_for_topic(topic: &str) -> Self {
        PushTarget::Condition(format!("'{topic}' in topics"))
    }
}

impl std::fmt::Display for PushTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushTarget::Topic(t) => write!(f, "topic:{t}"),
            PushTarget::Condition(c) => write!(f, "condition:{c}"),
        }
    }
}

/// The user-visible part of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// A complete push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub target: PushTarget,
    pub notification: Notification,
    /// Key/value payload delivered to the app; values are always strings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    /// A notification-only push.
    pub fn new(target: PushTarget, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target,
            notification: Notification {
                title: title.into(),
                body: body.into(),
            },
            data: BTreeMap::new(),
        }
    }

    /// Attach a data payload.
    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = data;
        self
    }
}

/// The core Notifier trait.
///
/// Implementations: FCM HTTP v1, log-only.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A human-readable name for this notifier (e.g., "fcm").
    fn name(&self) -> &str;

    /// Deliver a push; returns the delivery id assigned by the service.
    async fn send(&self, message: &PushMessage) -> std::result::Result<String, NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_for_topic_quotes_name() {
        assert_eq!(
            PushTarget::condition_for_topic("admins"),
            PushTarget::Condition("'admins' in topics".into())
        );
    }

    #[test]
    fn target_display() {
        assert_eq!(PushTarget::Topic("admins".into()).to_string(), "topic:admins");
    }

    #[test]
    fn empty_data_is_not_serialized() {
        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "t", "b");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("data"));
    }
}
