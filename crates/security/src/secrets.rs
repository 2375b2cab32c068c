//! Server-side secrets.
//!
//! Handlers ask a [`SecretSource`] for secrets by name at call time instead
//! of holding them, so a missing secret surfaces as a per-request
//! configuration error rather than a startup failure.

use std::collections::HashMap;

/// Secret the data-encryption key is derived from.
pub const ENCRYPTION_ADMIN_KEY: &str = "ENCRYPTION_ADMIN_KEY";

/// Where handlers read secrets from.
pub trait SecretSource: Send + Sync {
    /// The secret's value; `None` when unset or empty.
    fn get(&self, name: &str) -> Option<String>;
}

/// A fixed set of secrets, usually filled from configuration at startup.
#[derive(Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret. `None` and empty values are skipped.
    pub fn with(mut self, name: &str, value: Option<String>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.values.insert(name.to_string(), value);
        }
        self
    }

    /// Whether a secret is available, without exposing it.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

impl std::fmt::Debug for StaticSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("StaticSecrets").field("names", &names).finish()
    }
}

/// Check if an output string contains any of the known secrets (leakage detection).
pub fn scan_for_leakage(output: &str, secrets: &[String]) -> bool {
    secrets.iter().any(|s| !s.is_empty() && output.contains(s))
}
