//! Actions an actor can perform on a model.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WardenError;

/// An operation class checked against a permission table.
///
/// The four CRUD actions are built in; anything else is a custom action
/// carried by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Provide a field when constructing an instance
    Create,
    /// Read a field
    Read,
    /// Overwrite a field
    Update,
    /// Clear a field, or remove the whole row
    Delete,
    /// Application-defined action
    Custom(String),
}

impl Action {
    /// The standard CRUD actions, in declaration order.
    pub const CRUD: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    /// Name used in permission tables
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Custom(name) => name,
        }
    }

    /// Whether this is one of the four CRUD actions
    #[must_use]
    pub fn is_crud(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }

    /// Parse an action name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty name.
    pub fn parse(name: &str) -> Result<Self, WardenError> {
        match name {
            "" => Err(WardenError::configuration("action name must not be empty")),
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Ok(Self::Custom(other.to_string())),
        }
    }
}

impl FromStr for Action {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}
