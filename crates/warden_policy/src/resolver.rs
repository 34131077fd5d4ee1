//! Role resolution.
//!
//! Which roles of a permission table apply to an actor and a resource is
//! decided by the host application: `self` when ids match, `owner` when the
//! resource points at the actor, `admin` when a flag is set, and so on.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use warden_core::Role;

/// Supplies the roles an actor holds on a resource
pub trait RoleResolver<A, R: ?Sized>: Send + Sync {
    /// Roles that apply to `actor` (None = anonymous) on `resource`
    fn roles(&self, actor: Option<&A>, resource: &R) -> BTreeSet<Role>;
}

type Predicate<A, R> = Box<dyn Fn(Option<&A>, &R) -> bool + Send + Sync>;

/// Closure-based resolver: one predicate per role, checked in order
pub struct RoleRules<A, R: ?Sized> {
    rules: Vec<(Role, Predicate<A, R>)>,
}

impl<A, R: ?Sized> RoleRules<A, R> {
    /// No roles
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Grant the `public` role to everyone, anonymous actors included
    #[must_use]
    pub fn public(self) -> Self {
        self.role_when(Role::PUBLIC, |_, _| true)
    }

    /// Grant `role` to authenticated actors for which `predicate` holds
    #[must_use]
    pub fn role<F>(self, role: impl Into<Role>, predicate: F) -> Self
    where
        F: Fn(&A, &R) -> bool + Send + Sync + 'static,
    {
        self.role_when(role, move |actor, resource| {
            actor.is_some_and(|actor| predicate(actor, resource))
        })
    }

    /// Grant `role` whenever `predicate` holds, including for anonymous
    /// actors
    #[must_use]
    pub fn role_when<F>(mut self, role: impl Into<Role>, predicate: F) -> Self
    where
        F: Fn(Option<&A>, &R) -> bool + Send + Sync + 'static,
    {
        self.rules.push((role.into(), Box::new(predicate)));
        self
    }

    /// Roles this resolver can grant
    pub fn known_roles(&self) -> impl Iterator<Item = &Role> {
        self.rules.iter().map(|(role, _)| role)
    }
}

impl<A, R: ?Sized> Default for RoleRules<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R: ?Sized> fmt::Debug for RoleRules<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleRules")
            .field("roles", &self.known_roles().collect::<Vec<_>>())
            .finish()
    }
}

impl<A, R: ?Sized> RoleResolver<A, R> for RoleRules<A, R> {
    fn roles(&self, actor: Option<&A>, resource: &R) -> BTreeSet<Role> {
        self.rules
            .iter()
            .filter(|(_, predicate)| predicate(actor, resource))
            .map(|(role, _)| role.clone())
            .collect()
    }
}

impl<A, R, T> RoleResolver<A, R> for Arc<T>
where
    R: ?Sized,
    T: RoleResolver<A, R> + ?Sized,
{
    fn roles(&self, actor: Option<&A>, resource: &R) -> BTreeSet<Role> {
        (**self).roles(actor, resource)
    }
}
