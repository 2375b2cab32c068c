//! Log-only notifier.

use async_trait::async_trait;
use myplant_core::error::NotifyError;
use myplant_core::notify::{Notifier, PushMessage};
use tracing::info;
use uuid::Uuid;

/// Writes every push to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &PushMessage) -> Result<String, NotifyError> {
        let id = format!("log/{}", Uuid::new_v4());
        info!(
            delivery_id = %id,
            target = %message.target,
            title = %message.notification.title,
            body = %message.notification.body,
            data_fields = message.data.len(),
            "Push notification (log only)"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myplant_core::notify::PushTarget;

    #[tokio::test]
    async fn returns_distinct_ids() {
        let notifier = LogNotifier::new();
        let msg = PushMessage::new(PushTarget::Topic("admins".into()), "t", "b");
        let a = notifier.send(&msg).await.unwrap();
        let b = notifier.send(&msg).await.unwrap();
        assert!(a.starts_with("log/"));
        assert_ne!(a, b);
    }
}
