//! Data-encryption key issuance.
//!
//! Devices and the admin app share one symmetric key for field-level
//! encryption. The key is never stored: it is re-derived on every request
//! from a server-side secret, so only admins who can call this endpoint
//! ever see it.

use chrono::{DateTime, Utc};
use myplant_core::error::CallableError;
use myplant_core::store::UserProfiles;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditLogger, AuditOutcome};
use crate::secrets::{ENCRYPTION_ADMIN_KEY, SecretSource};

/// Label hashed after the secret.
const KEY_LABEL: &str = "endangered_data_key";

/// Length of the issued key in hex characters (128 bits).
const KEY_HEX_LEN: usize = 32;

/// First 32 lowercase hex characters of `SHA-256(secret ‖ label)`.
pub fn derive_data_key(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(KEY_LABEL.as_bytes());
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_HEX_LEN);
    key
}

/// The callable result.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataKey {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("key", &"[REDACTED]")
            .field("timestamp", &self.timestamp)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Issues the data key to admins.
pub struct KeyIssuer {
    profiles: Arc<dyn UserProfiles>,
    secrets: Arc<dyn SecretSource>,
    audit: Arc<AuditLogger>,
}

impl KeyIssuer {
    pub fn new(
        profiles: Arc<dyn UserProfiles>,
        secrets: Arc<dyn SecretSource>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            profiles,
            secrets,
            audit,
        }
    }

    /// Issue the key to `caller`, the uid the platform authenticated.
    pub async fn issue(&self, caller: Option<&str>) -> Result<DataKey, CallableError> {
        let Some(user_id) = caller.filter(|uid| !uid.is_empty()) else {
            warn!("Data key requested without authentication");
            self.deny("anonymous", "unauthenticated");
            return Err(CallableError::Unauthenticated("User must be authenticated".into()));
        };

        info!(user_id, "Data key requested");

        let profile = match self.profiles.get_by_id(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id, error = %e, "Profile lookup failed");
                self.fail(user_id, "profile lookup failed");
                return Err(CallableError::Internal("Internal server error".into()));
            }
        };

        let Some(profile) = profile else {
            self.deny(user_id, "profile not found");
            return Err(CallableError::PermissionDenied("User profile not found".into()));
        };

        if !profile.is_admin() {
            self.deny(user_id, "not an admin");
            return Err(CallableError::PermissionDenied(
                "Only admins can access encryption keys".into(),
            ));
        }

        let Some(secret) = self.secrets.get(ENCRYPTION_ADMIN_KEY) else {
            error!("ENCRYPTION_ADMIN_KEY is not configured");
            self.fail(user_id, "secret not configured");
            return Err(CallableError::Internal("Internal server error".into()));
        };

        let key = derive_data_key(&secret);
        self.audit.log(AuditEvent::KeyIssued, user_id, AuditOutcome::Success);
        info!(user_id, "Data key issued");

        Ok(DataKey {
            key,
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
        })
    }

    fn deny(&self, user_id: &str, reason: &str) {
        let event = AuditEvent::KeyDenied { reason: reason.into() };
        self.audit.log(event, user_id, AuditOutcome::Denied);
    }

    fn fail(&self, user_id: &str, reason: &str) {
        let event = AuditEvent::KeyDenied { reason: reason.into() };
        self.audit.log(event, user_id, AuditOutcome::Failure);
    }
}
