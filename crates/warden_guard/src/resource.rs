//! Field access on model instances.

use serde_json::Value;
use warden_core::WardenResult;
use warden_policy::Permissioned;

/// A model whose fields can be read, written and cleared by name.
///
/// Implementations perform the raw operation only. Authorization happens in
/// [`Guarded`](crate::Guarded) before any of these methods is called.
pub trait Resource: Permissioned {
    /// Names of the fields this instance exposes
    fn field_names(&self) -> Vec<String>;

    /// Current value of `field`, `None` if the model has no such field
    fn read_field(&self, field: &str) -> Option<Value>;

    /// Assign `value` to `field`
    ///
    /// # Errors
    ///
    /// Returns a field error for unknown fields or values of the wrong type
    fn write_field(&mut self, field: &str, value: Value) -> WardenResult<()>;

    /// Reset `field` to its empty value
    ///
    /// # Errors
    ///
    /// Returns a field error for unknown or non-clearable fields
    fn clear_field(&mut self, field: &str) -> WardenResult<()>;
}
