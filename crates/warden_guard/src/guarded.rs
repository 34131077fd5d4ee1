//! Guarded model instances.
//!
//! [`Guarded`] owns a model instance and routes every field access through
//! [`check`](Guarded::check):
//!
//! 1. unprotected instances skip all checks;
//! 2. fields denied on the instance fail without asking the oracle. For
//!    actions other than `read`, an unreadable field reports the read
//!    denial instead so its existence is not confirmed;
//! 3. fields allowed on the instance pass without asking the oracle;
//! 4. everything else is decided by the guard's oracle for the current
//!    actor.
//!
//! A denied access leaves the instance untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use serde_json::Value;
use warden_core::{Action, FieldSet, Role, WILDCARD, WardenError, WardenResult};

use crate::guard::Guard;
use crate::resource::Resource;

type Overrides = IndexMap<Action, FieldSet>;

/// A model instance whose field accesses are authorized
pub struct Guarded<R, A> {
    instance: R,
    guard: Guard<A, R>,
    protected: bool,
    allowed: Overrides,
    denied: Overrides,
}

impl<R: Resource + 'static, A: 'static> Guarded<R, A> {
    pub(crate) fn new(instance: R, guard: Guard<A, R>, protected: bool) -> Self {
        Self {
            instance,
            guard,
            protected,
            allowed: Overrides::new(),
            denied: Overrides::new(),
        }
    }

    /// Read a field
    ///
    /// # Errors
    ///
    /// `Forbidden` if the actor may not read it, `Field` if the model has no
    /// such field
    pub fn get(&self, field: &str) -> WardenResult<Value> {
        self.check(&Action::Read, field)?;
        self.instance
            .read_field(field)
            .ok_or_else(|| self.no_such_field(field))
    }

    /// Assign a field
    ///
    /// # Errors
    ///
    /// `Forbidden` if the actor may not update it, or the model's own error
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> WardenResult<()> {
        self.check(&Action::Update, field)?;
        self.instance.write_field(field, value.into())
    }

    /// Clear a field
    ///
    /// # Errors
    ///
    /// `Forbidden` if the actor may not delete it, or the model's own error
    pub fn delete(&mut self, field: &str) -> WardenResult<()> {
        self.check(&Action::Delete, field)?;
        self.instance.clear_field(field)
    }

    /// Authorize deleting the whole row and hand the instance back for
    /// removal. Needs a wildcard `delete` grant.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the actor may not delete the row; the wrapper is
    /// dropped either way
    pub fn delete_row(self) -> WardenResult<R> {
        self.check(&Action::Delete, WILDCARD)?;
        tracing::debug!(model = self.instance.model_name(), "row delete authorized");
        Ok(self.instance)
    }

    /// Check one access without performing it
    ///
    /// # Errors
    ///
    /// `Forbidden` when the access is denied
    pub fn check(&self, action: &Action, field: &str) -> WardenResult<()> {
        if !self.protected {
            return Ok(());
        }

        if self.denied.get(action).is_some_and(|fields| fields.permits(field)) {
            if *action != Action::Read {
                self.check(&Action::Read, field)?;
            }
            tracing::debug!(
                model = self.instance.model_name(),
                %action,
                field,
                "access denied by instance override"
            );
            return Err(self.guard.forbidden(&self.instance, action, field));
        }

        if self.allowed.get(action).is_some_and(|fields| fields.permits(field)) {
            return Ok(());
        }

        let actor = self.guard.current_actor();
        self.guard
            .authorize(actor.as_ref(), &self.instance, action, field)
            .map(|_| ())
    }

    /// Whether the access would be allowed
    #[must_use]
    pub fn can(&self, action: &Action, field: &str) -> bool {
        self.check(action, field).is_ok()
    }

    /// Roles the current actor holds on this instance
    #[must_use]
    pub fn roles(&self) -> BTreeSet<Role> {
        let actor = self.guard.current_actor();
        self.guard.roles(actor.as_ref(), &self.instance)
    }

    /// Fields the model's table grants `role` for `action`
    #[must_use]
    pub fn authorized_fields_for(&self, role: &str, action: &Action) -> &FieldSet {
        self.instance.permissions().authorized_fields(role, action)
    }

    /// Fields of this instance the current actor may perform `action` on
    #[must_use]
    pub fn authorized_fields(&self, action: &Action) -> Vec<String> {
        self.instance
            .field_names()
            .into_iter()
            .filter(|field| self.can(action, field))
            .collect()
    }

    /// Allow `actions` on `fields` for this instance, skipping the oracle
    pub fn allow<I, S>(&mut self, actions: impl IntoIterator<Item = Action>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        add_override(&mut self.allowed, actions, &fields.into_iter().collect());
    }

    /// Allow `actions` on every field, row included
    pub fn allow_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        add_override(&mut self.allowed, actions, &FieldSet::all());
    }

    /// Deny `actions` on `fields` for this instance, regardless of roles
    pub fn deny<I, S>(&mut self, actions: impl IntoIterator<Item = Action>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        add_override(&mut self.denied, actions, &fields.into_iter().collect());
    }

    /// Deny `actions` on every field, row included
    pub fn deny_all(&mut self, actions: impl IntoIterator<Item = Action>) {
        add_override(&mut self.denied, actions, &FieldSet::all());
    }

    /// [`allow`](Self::allow) until the returned scope drops
    pub fn allowed<I, S>(&mut self, actions: impl IntoIterator<Item = Action>, fields: I) -> OverrideScope<'_, R, A>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OverrideScope::enter(self, OverrideKind::Allow, actions, &fields.into_iter().collect())
    }

    /// [`allow_all`](Self::allow_all) until the returned scope drops
    pub fn allowed_all(&mut self, actions: impl IntoIterator<Item = Action>) -> OverrideScope<'_, R, A> {
        OverrideScope::enter(self, OverrideKind::Allow, actions, &FieldSet::all())
    }

    /// [`deny`](Self::deny) until the returned scope drops
    pub fn denied<I, S>(&mut self, actions: impl IntoIterator<Item = Action>, fields: I) -> OverrideScope<'_, R, A>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OverrideScope::enter(self, OverrideKind::Deny, actions, &fields.into_iter().collect())
    }

    /// [`deny_all`](Self::deny_all) until the returned scope drops
    pub fn denied_all(&mut self, actions: impl IntoIterator<Item = Action>) -> OverrideScope<'_, R, A> {
        OverrideScope::enter(self, OverrideKind::Deny, actions, &FieldSet::all())
    }

    /// Turn checks on
    pub fn protect(&mut self) {
        self.protected = true;
    }

    /// Turn checks off. Every access succeeds until [`protect`](Self::protect).
    pub fn expose(&mut self) {
        tracing::debug!(model = self.instance.model_name(), "instance exposed");
        self.protected = false;
    }

    /// Checks on until the returned scope drops
    pub fn protected(&mut self) -> ExposureScope<'_, R, A> {
        ExposureScope::enter(self, true)
    }

    /// Checks off until the returned scope drops
    pub fn exposed(&mut self) -> ExposureScope<'_, R, A> {
        tracing::debug!(model = self.instance.model_name(), "instance exposed for scope");
        ExposureScope::enter(self, false)
    }

    /// Whether checks are on
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// The guard this instance was wrapped with
    #[must_use]
    pub fn guard(&self) -> &Guard<A, R> {
        &self.guard
    }

    /// Unwrap for trusted code such as persistence
    #[must_use]
    pub fn into_inner(self) -> R {
        self.instance
    }

    fn no_such_field(&self, field: &str) -> WardenError {
        WardenError::field(self.instance.model_name(), field, "no such field")
    }
}

impl<R: Resource, A> fmt::Debug for Guarded<R, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("model", &self.instance.model_name())
            .field("protected", &self.protected)
            .field("allowed", &self.allowed)
            .field("denied", &self.denied)
            .finish_non_exhaustive()
    }
}

/// Adds `fields` for each action and returns the entries that were new
fn add_override(
    overrides: &mut Overrides,
    actions: impl IntoIterator<Item = Action>,
    fields: &FieldSet,
) -> Vec<(Action, String)> {
    let mut added = Vec::new();
    for action in actions {
        let granted = overrides.entry(action.clone()).or_default();
        for field in fields.iter() {
            if granted.insert(field) {
                added.push((action.clone(), field.to_string()));
            }
        }
    }
    added
}

#[derive(Debug, Clone, Copy)]
enum OverrideKind {
    Allow,
    Deny,
}

/// Instance override in effect until dropped. Dereferences to the wrapper.
///
/// Dropping removes only the entries this scope added. Overrides that were
/// already present stay, as do new ones made through the scope with
/// [`allow`](Guarded::allow) / [`deny`](Guarded::deny) that the scope did not
/// add itself.
pub struct OverrideScope<'g, R, A> {
    guarded: &'g mut Guarded<R, A>,
    kind: OverrideKind,
    added: Vec<(Action, String)>,
}

impl<'g, R, A> OverrideScope<'g, R, A> {
    fn enter(
        guarded: &'g mut Guarded<R, A>,
        kind: OverrideKind,
        actions: impl IntoIterator<Item = Action>,
        fields: &FieldSet,
    ) -> Self {
        let overrides = match kind {
            OverrideKind::Allow => &mut guarded.allowed,
            OverrideKind::Deny => &mut guarded.denied,
        };
        let added = add_override(overrides, actions, fields);
        Self { guarded, kind, added }
    }
}

impl<R, A> Deref for OverrideScope<'_, R, A> {
    type Target = Guarded<R, A>;

    fn deref(&self) -> &Self::Target {
        self.guarded
    }
}

impl<R, A> DerefMut for OverrideScope<'_, R, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guarded
    }
}

impl<R, A> Drop for OverrideScope<'_, R, A> {
    fn drop(&mut self) {
        let overrides = match self.kind {
            OverrideKind::Allow => &mut self.guarded.allowed,
            OverrideKind::Deny => &mut self.guarded.denied,
        };
        for (action, field) in self.added.drain(..) {
            if let Some(fields) = overrides.get_mut(&action) {
                fields.remove(&field);
                if fields.is_empty() {
                    overrides.shift_remove(&action);
                }
            }
        }
    }
}

/// Protection flag in effect until dropped. Dereferences to the wrapper.
pub struct ExposureScope<'g, R, A> {
    guarded: &'g mut Guarded<R, A>,
    previous: bool,
}

impl<'g, R, A> ExposureScope<'g, R, A> {
    fn enter(guarded: &'g mut Guarded<R, A>, protected: bool) -> Self {
        let previous = std::mem::replace(&mut guarded.protected, protected);
        Self { guarded, previous }
    }
}

impl<R, A> Deref for ExposureScope<'_, R, A> {
    type Target = Guarded<R, A>;

    fn deref(&self) -> &Self::Target {
        self.guarded
    }
}

impl<R, A> DerefMut for ExposureScope<'_, R, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guarded
    }
}

impl<R, A> Drop for ExposureScope<'_, R, A> {
    fn drop(&mut self) {
        self.guarded.protected = self.previous;
    }
}
