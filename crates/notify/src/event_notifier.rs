//! Event-created trigger: forwards new event documents as pushes.
//!
//! The primary push goes to the admin topic with the full data payload.
//! If that fails, exactly one retry goes to the equivalent topic condition
//! carrying the notification only. Failures never propagate; the trigger
//! source must not retry on our account.

use myplant_core::notify::{Notifier, PushMessage, PushTarget};
use myplant_core::record::EventRecord;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_DEVICE: &str = "Unknown device";
const DEFAULT_MESSAGE: &str = "New event detected";
const DEFAULT_PRIORITY: &str = "medium";
const DEFAULT_TYPE: &str = "unknown";

/// Handles creation of `events/{eventId}` documents.
pub struct EventNotifier {
    notifier: Arc<dyn Notifier>,
    topic: String,
}

/// An event with every display field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
    device_id: String,
    message: String,
    priority: String,
    kind: String,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl Resolved {
    fn from_event(event: &EventRecord) -> Self {
        Self {
            device_id: or_default(&event.device_id, DEFAULT_DEVICE),
            message: or_default(&event.message, DEFAULT_MESSAGE),
            priority: or_default(&event.priority, DEFAULT_PRIORITY),
            kind: or_default(&event.kind, DEFAULT_TYPE),
        }
    }

    fn title(&self) -> String {
        format!("{} from {}", self.kind.to_uppercase(), self.device_id)
    }

    fn body(&self) -> String {
        format!("{} (Priority: {})", self.message, self.priority)
    }
}

impl EventNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, topic: impl Into<String>) -> Self {
        Self {
            notifier,
            topic: topic.into(),
        }
    }

    /// The primary push for an event: topic target, notification and data.
    pub fn primary_push(&self, event_id: &str, event: &EventRecord) -> PushMessage {
        let resolved = Resolved::from_event(event);

        let mut data = BTreeMap::new();
        data.insert("deviceId".to_string(), resolved.device_id.clone());
        data.insert("message".to_string(), resolved.message.clone());
        data.insert("priority".to_string(), resolved.priority.clone());
        data.insert("type".to_string(), resolved.kind.clone());
        data.insert("value".to_string(), event.value_text());
        data.insert("timestamp".to_string(), event.timestamp_text());
        data.insert("eventId".to_string(), event_id.to_string());

        PushMessage::new(
            PushTarget::Topic(self.topic.clone()),
            resolved.title(),
            resolved.body(),
        )
        .with_data(data)
    }

    /// The single retry: topic condition, notification only.
    pub fn fallback_push(&self, event: &EventRecord) -> PushMessage {
        let resolved = Resolved::from_event(event);
        PushMessage::new(
            PushTarget::condition_for_topic(&self.topic),
            resolved.title(),
            resolved.body(),
        )
    }

    /// Handle one created document. `document` is `None` (or JSON `null`)
    /// when the trigger carried no data.
    ///
    /// Returns the delivery id of whichever push succeeded.
    pub async fn on_event_created(&self, event_id: &str, document: Option<&Value>) -> Option<String> {
        let document = match document {
            None | Some(Value::Null) => {
                warn!(event_id, "Event trigger carried no document data");
                return None;
            }
            Some(doc) => doc,
        };

        let event: EventRecord = match serde_json::from_value(document.clone()) {
            Ok(event) => event,
            Err(e) => {
                error!(event_id, error = %e, "Event document is not an object");
                return None;
            }
        };

        let primary = self.primary_push(event_id, &event);
        match self.notifier.send(&primary).await {
            Ok(id) => {
                info!(event_id, delivery_id = %id, target = %primary.target, "Event notification sent");
                return Some(id);
            }
            Err(e) => {
                warn!(event_id, error = %e, "Topic push failed, retrying with condition");
            }
        }

        let fallback = self.fallback_push(&event);
        match self.notifier.send(&fallback).await {
            Ok(id) => {
                info!(event_id, delivery_id = %id, target = %fallback.target, "Event notification sent via fallback");
                Some(id)
            }
            Err(e) => {
                error!(event_id, error = %e, "Fallback push failed, event notification dropped");
                None
            }
        }
    }
}
