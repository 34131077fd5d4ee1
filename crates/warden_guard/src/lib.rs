//! WARDEN Guard
//!
//! Wraps model instances so every field read, write and delete is checked
//! against an authorization oracle for the current actor before it happens.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod config;
pub mod guard;
pub mod guarded;
pub mod resource;

#[cfg(test)]
pub(crate) mod fixtures;

pub use actor::{ActorScope, ActorSource, FixedActor, FnActorSource, ScopedActor};
pub use config::{CreateOptions, GuardConfig};
pub use guard::Guard;
pub use guarded::{ExposureScope, Guarded, OverrideScope};
pub use resource::Resource;
