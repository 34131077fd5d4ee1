//! Authorization oracles.
//!
//! An oracle answers one question per call: may `actor` perform `action` on
//! `field` of `resource`? It is synchronous and side-effect free from the
//! guard's point of view.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use warden_core::{Action, Role};

/// One access check
#[derive(Debug)]
pub struct AccessRequest<'a, A, R: ?Sized> {
    /// Current actor, `None` when anonymous
    pub actor: Option<&'a A>,
    /// Requested action
    pub action: &'a Action,
    /// Model instance being accessed
    pub resource: &'a R,
    /// Field name, or `*` for a row-level check
    pub field: &'a str,
}

impl<A, R: ?Sized> Clone for AccessRequest<'_, A, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R: ?Sized> Copy for AccessRequest<'_, A, R> {}

impl<'a, A, R: ?Sized> AccessRequest<'a, A, R> {
    /// Create a request
    #[must_use]
    pub fn new(actor: Option<&'a A>, action: &'a Action, resource: &'a R, field: &'a str) -> Self {
        Self {
            actor,
            action,
            resource,
            field,
        }
    }
}

/// Oracle decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the access is allowed
    pub allowed: bool,
    /// Role that granted the access, when known
    pub matched_role: Option<Role>,
    /// Human-readable reason
    pub reason: String,
}

impl Decision {
    /// Allow, crediting `role`
    #[must_use]
    pub fn allow_by(role: Role) -> Self {
        Self {
            reason: format!("granted to role '{role}'"),
            allowed: true,
            matched_role: Some(role),
        }
    }

    /// Allow without naming a role
    #[must_use]
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            matched_role: None,
            reason: reason.into(),
        }
    }

    /// Deny
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            matched_role: None,
            reason: reason.into(),
        }
    }
}

/// Decision procedure for a single access check.
///
/// The default in-process implementation is
/// [`TableOracle`](crate::TableOracle). Engine-backed implementations plug in
/// here, directly or through [`FnOracle`].
pub trait AuthorizationOracle<A, R: ?Sized>: Send + Sync {
    /// Decide one request
    fn evaluate(&self, request: &AccessRequest<'_, A, R>) -> Decision;

    /// Boolean shorthand for [`evaluate`](Self::evaluate)
    fn is_allowed(&self, actor: Option<&A>, action: &Action, resource: &R, field: &str) -> bool {
        self.evaluate(&AccessRequest::new(actor, action, resource, field))
            .allowed
    }
}

impl<A, R, O> AuthorizationOracle<A, R> for Arc<O>
where
    R: ?Sized,
    O: AuthorizationOracle<A, R> + ?Sized,
{
    fn evaluate(&self, request: &AccessRequest<'_, A, R>) -> Decision {
        (**self).evaluate(request)
    }
}

/// Oracle backed by a closure returning a boolean
pub struct FnOracle<F> {
    name: String,
    decide: F,
}

impl<F> FnOracle<F> {
    /// Wrap `decide`, naming it in decision reasons
    #[must_use]
    pub fn new(name: impl Into<String>, decide: F) -> Self {
        Self {
            name: name.into(),
            decide,
        }
    }
}

impl<A, R, F> AuthorizationOracle<A, R> for FnOracle<F>
where
    R: ?Sized,
    F: Fn(&AccessRequest<'_, A, R>) -> bool + Send + Sync,
{
    fn evaluate(&self, request: &AccessRequest<'_, A, R>) -> Decision {
        if (self.decide)(request) {
            Decision::allow(format!("allowed by {}", self.name))
        } else {
            Decision::deny(format!("denied by {}", self.name))
        }
    }
}

/// Decorator that logs every decision and counts evaluations
pub struct AuditingOracle<O> {
    inner: O,
    evaluations: AtomicU64,
    denials: AtomicU64,
}

impl<O> AuditingOracle<O> {
    /// Wrap an oracle
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            evaluations: AtomicU64::new(0),
            denials: AtomicU64::new(0),
        }
    }

    /// Number of decisions made so far
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Number of denials so far
    #[must_use]
    pub fn denials(&self) -> u64 {
        self.denials.load(Ordering::Relaxed)
    }

    /// The wrapped oracle
    #[must_use]
    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<A, R, O> AuthorizationOracle<A, R> for AuditingOracle<O>
where
    R: ?Sized,
    O: AuthorizationOracle<A, R>,
{
    fn evaluate(&self, request: &AccessRequest<'_, A, R>) -> Decision {
        let decision = self.inner.evaluate(request);
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        if decision.allowed {
            tracing::debug!(
                action = %request.action,
                field = request.field,
                anonymous = request.actor.is_none(),
                role = decision.matched_role.as_ref().map(Role::as_str),
                "access allowed"
            );
        } else {
            self.denials.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                action = %request.action,
                field = request.field,
                anonymous = request.actor.is_none(),
                reason = %decision.reason,
                "access denied"
            );
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc;

    #[test]
    fn test_decision_constructors() {
        let allow = Decision::allow_by(Role::new("owner"));
        assert!(allow.allowed);
        assert_eq!(allow.matched_role, Some(Role::new("owner")));
        assert!(allow.reason.contains("owner"));

        let deny = Decision::deny("no matching role");
        assert!(!deny.allowed);
        assert!(deny.matched_role.is_none());
    }

    #[test]
    fn test_fn_oracle() {
        let oracle = FnOracle::new("read-only", |req: &AccessRequest<'_, String, Doc>| {
            *req.action == Action::Read
        });

        let actor = "alice".to_string();
        assert!(oracle.is_allowed(Some(&actor), &Action::Read, &Doc, "title"));
        assert!(!oracle.is_allowed(Some(&actor), &Action::Update, &Doc, "title"));

        let decision = oracle.evaluate(&AccessRequest::new(None::<&String>, &Action::Update, &Doc, "title"));
        assert_eq!(decision.reason, "denied by read-only");
    }

    #[test]
    fn test_auditing_oracle_counts() {
        let oracle = AuditingOracle::new(FnOracle::new(
            "named-actor",
            |req: &AccessRequest<'_, String, Doc>| req.actor.is_some(),
        ));

        let actor = "bob".to_string();
        assert!(oracle.is_allowed(Some(&actor), &Action::Read, &Doc, "title"));
        assert!(!oracle.is_allowed(None::<&String>, &Action::Read, &Doc, "title"));
        assert!(!oracle.is_allowed(None::<&String>, &Action::Delete, &Doc, "*"));

        assert_eq!(oracle.evaluations(), 3);
        assert_eq!(oracle.denials(), 2);
    }
}
