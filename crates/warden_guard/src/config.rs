//! Guard configuration.

use serde::{Deserialize, Serialize};
use warden_core::WardenResult;

/// Defaults applied by a [`Guard`](crate::Guard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Wrapped instances start with checks on
    pub protected_by_default: bool,
    /// Check `create` on provided fields when constructing
    pub check_create_by_default: bool,
    /// Report read denials as "not found"
    pub conceal_reads: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_by_default: true,
            check_create_by_default: false,
            conceal_reads: true,
        }
    }
}

impl GuardConfig {
    /// Load from JSON; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input
    pub fn from_json(json: &str) -> WardenResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Construction options derived from these defaults
    #[must_use]
    pub fn create_options(&self) -> CreateOptions {
        CreateOptions {
            check_create: self.check_create_by_default,
            protected: self.protected_by_default,
        }
    }
}

/// Per-construction options for [`Guard::create`](crate::Guard::create)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Check `create` on every provided field before wrapping
    pub check_create: bool,
    /// Enforce checks after construction. `false` is an explicit bypass.
    pub protected: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        GuardConfig::default().create_options()
    }
}

impl CreateOptions {
    /// Set `check_create`
    #[must_use]
    pub fn check_create(mut self, check: bool) -> Self {
        self.check_create = check;
        self
    }

    /// Set `protected`
    #[must_use]
    pub fn protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert!(config.protected_by_default);
        assert!(!config.check_create_by_default);
        assert!(config.conceal_reads);

        let options = CreateOptions::default();
        assert!(options.protected);
        assert!(!options.check_create);
    }

    #[test]
    fn test_from_json_partial() {
        let config = GuardConfig::from_json(r#"{ "check_create_by_default": true }"#).unwrap();
        assert!(config.check_create_by_default);
        assert!(config.protected_by_default);
        assert!(config.create_options().check_create);
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(GuardConfig::from_json("{ conceal_reads: ").is_err());
    }
}
