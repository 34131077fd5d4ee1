//! WARDEN Core Types
//!
//! Shared vocabulary for field-level access control: actions, roles,
//! field sets and the error type every other crate returns.
//! This crate performs no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod error;
pub mod field;
pub mod role;

// Re-exports
pub use action::Action;
pub use error::{WardenError, WardenResult};
pub use field::{FieldSet, WILDCARD, is_wildcard};
pub use role::Role;
