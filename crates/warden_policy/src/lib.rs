//! WARDEN Policy System
//!
//! Declarative per-role permission tables, normalized once per model, and
//! the oracles that answer "may this actor do this to this field?".

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod declarative;
pub mod oracle;
pub mod resolver;
pub mod table;
pub mod table_oracle;

pub use declarative::{DeclarativeInput, RoleGrant, Rule};
pub use oracle::{AccessRequest, AuditingOracle, AuthorizationOracle, Decision, FnOracle};
pub use resolver::{RoleResolver, RoleRules};
pub use table::{Permissioned, PermissionTable, PermissionTableBuilder};
pub use table_oracle::TableOracle;
