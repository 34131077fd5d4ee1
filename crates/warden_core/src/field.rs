//! Field sets and the wildcard field.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Field name meaning "every field of the model".
pub const WILDCARD: &str = "*";

/// Check whether a field name is the wildcard
#[must_use]
pub fn is_wildcard(field: &str) -> bool {
    field == WILDCARD
}

/// Insertion-ordered set of field names granted for one role and action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet {
    fields: IndexSet<String>,
}

impl FieldSet {
    /// Create an empty field set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the wildcard
    #[must_use]
    pub fn all() -> Self {
        let mut set = Self::new();
        set.insert(WILDCARD);
        set
    }

    /// Add a field. Returns false if it was already present.
    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.fields.insert(field.into())
    }

    /// Remove a field, keeping the order of the rest. Returns false if it
    /// was absent.
    pub fn remove(&mut self, field: &str) -> bool {
        self.fields.shift_remove(field)
    }

    /// Add every field of `other`, keeping first-seen order
    pub fn extend_from(&mut self, other: &FieldSet) {
        for field in &other.fields {
            self.fields.insert(field.clone());
        }
    }

    /// Literal membership, without wildcard expansion
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Whether the set grants the wildcard
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.fields.contains(WILDCARD)
    }

    /// Whether `field` is authorized by this set.
    ///
    /// Asking for the wildcard itself only succeeds when the set grants the
    /// wildcard; a list of concrete fields never adds up to `*`.
    #[must_use]
    pub fn permits(&self, field: &str) -> bool {
        self.is_wildcard() || (!is_wildcard(field) && self.contains(field))
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the field names
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for field in iter {
            set.insert(field);
        }
        set
    }
}
