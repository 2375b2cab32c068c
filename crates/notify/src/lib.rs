//! Push notifications for the myPlant backend.
//!
//! - [`FcmNotifier`] sends through the FCM HTTP v1 API.
//! - [`LogNotifier`] only logs, for local runs.
//! - [`EventNotifier`] turns newly created event documents into pushes.

pub mod event_notifier;
pub mod fcm;
pub mod log_notifier;

pub use event_notifier::EventNotifier;
pub use fcm::FcmNotifier;
pub use log_notifier::LogNotifier;
