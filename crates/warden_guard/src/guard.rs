//! Shared guard handle.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use warden_core::{Action, Role, WardenError, WardenResult};
use warden_policy::{AccessRequest, AuthorizationOracle, Decision, RoleResolver, TableOracle};

use crate::actor::ActorSource;
use crate::config::{CreateOptions, GuardConfig};
use crate::guarded::Guarded;
use crate::resource::Resource;

/// Oracle, actor source and configuration shared by every instance of a
/// model. Cheap to clone.
pub struct Guard<A, R> {
    oracle: Arc<dyn AuthorizationOracle<A, R>>,
    resolver: Option<Arc<dyn RoleResolver<A, R>>>,
    actors: Arc<dyn ActorSource<A>>,
    config: GuardConfig,
}

impl<A, R> Clone for Guard<A, R> {
    fn clone(&self) -> Self {
        Self {
            oracle: Arc::clone(&self.oracle),
            resolver: self.resolver.clone(),
            actors: Arc::clone(&self.actors),
            config: self.config,
        }
    }
}

impl<A, R> fmt::Debug for Guard<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("config", &self.config)
            .field("resolves_roles", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl<A: 'static, R: Resource + 'static> Guard<A, R> {
    /// Guard backed by an arbitrary oracle. Roles are not reported unless a
    /// resolver is added with [`with_resolver`](Self::with_resolver).
    #[must_use]
    pub fn new<O, S>(oracle: O, actors: S) -> Self
    where
        O: AuthorizationOracle<A, R> + 'static,
        S: ActorSource<A> + 'static,
    {
        Self {
            oracle: Arc::new(oracle),
            resolver: None,
            actors: Arc::new(actors),
            config: GuardConfig::default(),
        }
    }

    /// Guard evaluating each model's own permission table, with roles from
    /// `resolver`
    #[must_use]
    pub fn with_roles<Res, S>(resolver: Res, actors: S) -> Self
    where
        Res: RoleResolver<A, R> + 'static,
        S: ActorSource<A> + 'static,
    {
        let resolver: Arc<dyn RoleResolver<A, R>> = Arc::new(resolver);
        Self::new(TableOracle::new(Arc::clone(&resolver)), actors).with_resolver(resolver)
    }

    /// Report roles through `resolver`
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn RoleResolver<A, R>>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Actor performing the current access
    #[must_use]
    pub fn current_actor(&self) -> Option<A> {
        self.actors.current()
    }

    /// Wrap an existing instance (e.g. one loaded from storage) without
    /// create checks
    #[must_use]
    pub fn wrap(&self, instance: R) -> Guarded<R, A> {
        Guarded::new(instance, self.clone(), self.config.protected_by_default)
    }

    /// Wrap a newly constructed instance.
    ///
    /// With `check_create`, the current actor must be allowed to `create`
    /// every field in `provided_fields`; otherwise no wrapper is returned.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for the first provided field the actor may not
    /// create
    pub fn create<I>(&self, instance: R, provided_fields: I, options: CreateOptions) -> WardenResult<Guarded<R, A>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if options.check_create {
            let actor = self.current_actor();
            for field in provided_fields {
                self.authorize(actor.as_ref(), &instance, &Action::Create, field.as_ref())?;
            }
        }

        if !options.protected {
            tracing::debug!(model = instance.model_name(), "instance created unprotected");
        }

        Ok(Guarded::new(instance, self.clone(), options.protected))
    }

    /// Ask the oracle about one access.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the oracle denies it
    pub fn authorize(&self, actor: Option<&A>, instance: &R, action: &Action, field: &str) -> WardenResult<Decision> {
        let decision = self
            .oracle
            .evaluate(&AccessRequest::new(actor, action, instance, field));

        if decision.allowed {
            tracing::trace!(
                model = instance.model_name(),
                %action,
                field,
                reason = %decision.reason,
                "access granted"
            );
            Ok(decision)
        } else {
            tracing::debug!(
                model = instance.model_name(),
                %action,
                field,
                reason = %decision.reason,
                "access denied"
            );
            Err(self.forbidden(instance, action, field))
        }
    }

    /// Roles `actor` holds on `instance`; empty when no resolver is set
    #[must_use]
    pub fn roles(&self, actor: Option<&A>, instance: &R) -> BTreeSet<Role> {
        self.resolver
            .as_ref()
            .map(|resolver| resolver.roles(actor, instance))
            .unwrap_or_default()
    }

    pub(crate) fn forbidden(&self, instance: &R, action: &Action, field: &str) -> WardenError {
        WardenError::Forbidden {
            model: instance.model_name().to_string(),
            action: action.clone(),
            field: field.to_string(),
            hidden: self.config.conceal_reads && *action == Action::Read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::FixedActor;
    use crate::fixtures::{User, Viewer, user, user_guard, user_rules};
    use warden_policy::{AuditingOracle, FnOracle};

    #[test]
    fn test_create_without_check() {
        let guard = user_guard(None);
        let guarded = guard
            .create(user("1", "ann"), ["id", "username"], CreateOptions::default())
            .unwrap();
        assert!(guarded.is_protected());
    }

    #[test]
    fn test_check_create_denies_anonymous() {
        let guard = user_guard(None);
        let err = guard
            .create(user("1", "ann"), ["username"], CreateOptions::default().check_create(true))
            .unwrap_err();

        match err {
            WardenError::Forbidden { action, field, hidden, .. } => {
                assert_eq!(action, Action::Create);
                assert_eq!(field, "username");
                assert!(!hidden);
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[test]
    fn test_check_create_per_field() {
        let guard = user_guard(Some(Viewer::new("1")));
        let options = CreateOptions::default().check_create(true);

        assert!(guard.create(user("1", "ann"), ["username", "fullname"], options).is_ok());
        assert!(guard.create(user("1", "ann"), ["username", "id"], options).is_err());
    }

    #[test]
    fn test_check_create_from_config() {
        let config = GuardConfig {
            check_create_by_default: true,
            ..GuardConfig::default()
        };
        let guard = user_guard(None).with_config(config);
        let options = guard.config().create_options();
        assert!(guard.create(user("1", "ann"), ["id"], options).is_err());
    }

    #[test]
    fn test_roles_without_resolver() {
        let guard: Guard<Viewer, User> = Guard::new(
            FnOracle::new("allow-all", |_: &AccessRequest<'_, Viewer, User>| true),
            FixedActor::new(Viewer::new("1")),
        );
        let target = user("1", "ann");
        assert!(guard.roles(guard.current_actor().as_ref(), &target).is_empty());
    }

    #[test]
    fn test_roles_with_resolver() {
        let guard = user_guard(Some(Viewer::new("1")));
        let target = user("1", "ann");
        let roles: Vec<String> = guard
            .roles(guard.current_actor().as_ref(), &target)
            .into_iter()
            .map(|role| role.to_string())
            .collect();
        assert_eq!(roles, vec!["public", "self"]);
    }

    #[test]
    fn test_authorize_goes_through_oracle() {
        let audit = Arc::new(AuditingOracle::new(TableOracle::new(user_rules())));
        let guard = Guard::new(Arc::clone(&audit), FixedActor::<Viewer>::anonymous());
        let target = user("1", "ann");

        assert!(guard.authorize(None, &target, &Action::Read, "username").is_ok());
        let err = guard.authorize(None, &target, &Action::Read, "fullname").unwrap_err();
        assert_eq!(err.status_code(), 404);

        assert_eq!(audit.evaluations(), 2);
        assert_eq!(audit.denials(), 1);
    }

    #[test]
    fn test_unconcealed_reads() {
        let config = GuardConfig {
            conceal_reads: false,
            ..GuardConfig::default()
        };
        let guard = user_guard(None).with_config(config);
        let err = guard
            .authorize(None, &user("1", "ann"), &Action::Read, "fullname")
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
