//! In-process oracle evaluating a model's own permission table.

use warden_core::Role;

use crate::oracle::{AccessRequest, AuthorizationOracle, Decision};
use crate::resolver::RoleResolver;
use crate::table::Permissioned;

/// Default oracle.
///
/// Permitted iff some role in `resolver.roles(actor, resource)` is granted
/// `action` on `field` by the resource's table, `"*"` standing for any
/// field. Row-level requests (field `"*"`) need a literal wildcard grant.
#[derive(Debug)]
pub struct TableOracle<Res> {
    resolver: Res,
}

impl<Res> TableOracle<Res> {
    /// Use `resolver` to decide which roles apply
    #[must_use]
    pub fn new(resolver: Res) -> Self {
        Self { resolver }
    }

    /// The role resolver
    #[must_use]
    pub fn resolver(&self) -> &Res {
        &self.resolver
    }
}

impl<A, R, Res> AuthorizationOracle<A, R> for TableOracle<Res>
where
    R: Permissioned + ?Sized,
    Res: RoleResolver<A, R>,
{
    fn evaluate(&self, request: &AccessRequest<'_, A, R>) -> Decision {
        let roles = self.resolver.roles(request.actor, request.resource);
        if roles.is_empty() {
            return Decision::deny("no applicable roles");
        }

        let table = request.resource.permissions();
        let granted = roles
            .iter()
            .find(|role| table.permits(role.as_str(), request.action, request.field));

        match granted {
            Some(role) => Decision::allow_by(role.clone()),
            None => Decision::deny(format!(
                "no role among [{}] may {} '{}' on {}",
                roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", "),
                request.action,
                request.field,
                request.resource.model_name(),
            )),
        }
    }
}
