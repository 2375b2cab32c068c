//! # myPlant Core
//!
//! Domain types, traits, and error definitions for the myPlant backend.
//! This crate has **no framework dependencies**; it defines the records,
//! the collaborator traits, and the errors that every other crate builds on.
//!
//! ## Collaborators
//!
//! Every external service is a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`]: LLM chat completions (`myplant-providers`)
//! - [`UserProfiles`], [`Devices`], [`Readings`], [`Events`]: document store
//!   repositories (`myplant-store`)
//! - [`Notifier`]: push-notification dispatch (`myplant-notify`)
//!
//! Handlers receive these as `Arc<dyn Trait>` so tests can swap in fakes.

pub mod error;
pub mod message;
pub mod notify;
pub mod provider;
pub mod record;
pub mod store;
pub mod timestamp;

// Re-export key types at crate root for ergonomics
pub use error::{CallableError, NotifyError, ProviderError, StoreError};
pub use message::{Message, Role};
pub use notify::{Notification, Notifier, PushMessage, PushTarget};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use record::{DeviceRecord, EventRecord, RawTimestamp, Reading, UserProfile};
pub use store::{Devices, Events, FetchPolicy, Readings, RecentQuery, UserProfiles};
pub use timestamp::{is_valid_timestamp, parse_timestamp, validity_floor};
