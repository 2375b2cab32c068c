//! Security module for the myPlant backend: data-key issuance, secret
//! sources, and audit logging.
//!
//! Provides:
//! - **Keys**: Admin-only derivation of the shared data-encryption key
//! - **Secrets**: Server-side secret lookup behind a trait
//! - **Audit logging**: Structured security event logging

pub mod audit;
pub mod keys;
pub mod secrets;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TRAIL_CAPACITY, TracingSink};
pub use keys::{DataKey, KeyIssuer, derive_data_key};
pub use secrets::{ENCRYPTION_ADMIN_KEY, SecretSource, StaticSecrets};
