//! Document store backends for the myPlant backend.
//!
//! Both backends implement every repository trait from `myplant_core::store`:
//! - [`FirestoreStore`] talks to the Firestore REST API.
//! - [`InMemoryStore`] keeps JSON documents in memory, for tests and local runs.

pub mod document;
pub mod firestore;
pub mod in_memory;

pub use firestore::FirestoreStore;
pub use in_memory::InMemoryStore;

/// Collection names.
pub mod collections {
    pub const USER_PROFILES: &str = "userProfiles";
    pub const DEVICES: &str = "devices";
    pub const READINGS: &str = "readings";
    pub const EVENTS: &str = "events";
}
