//! Role names.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A label describing an actor's relationship to a resource
/// (`owner`, `admin`, `self`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Name of the fallback role every table may grant to anyone.
    pub const PUBLIC: &'static str = "public";

    /// Create a role from its name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `public` role
    #[must_use]
    pub fn public() -> Self {
        Self(Self::PUBLIC.to_string())
    }

    /// Role name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the `public` role
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.0 == Self::PUBLIC
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_public_role() {
        assert!(Role::public().is_public());
        assert!(!Role::new("admin").is_public());
    }

    #[test]
    fn test_lookup_by_str() {
        let roles: BTreeSet<Role> = ["self", "admin"].into_iter().map(Role::from).collect();
        assert!(roles.contains("self"));
        assert!(!roles.contains("friend"));
    }
}
