//! Subcommand implementations. Each returns what `main` prints.

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::fmt::{self, Write};
use std::path::Path;
use warden_core::{Action, Role};
use warden_policy::{AccessRequest, AuthorizationOracle, Permissioned, PermissionTable, RoleRules, TableOracle};

/// A permissions file loaded as a model
struct Model {
    name: String,
    table: PermissionTable,
}

impl Permissioned for Model {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn permissions(&self) -> &PermissionTable {
        &self.table
    }
}

fn load(path: &Path) -> Result<Model> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let table = PermissionTable::from_json(&text).wrap_err_with(|| format!("loading {}", path.display()))?;
    let name = path
        .file_stem()
        .map_or_else(|| "model".to_string(), |stem| stem.to_string_lossy().into_owned());

    tracing::info!(model = %name, roles = table.roles().count(), "permission table loaded");
    Ok(Model { name, table })
}

/// Normalized table as pretty JSON
pub fn normalize(path: &Path) -> Result<String> {
    Ok(load(path)?.table.to_json_pretty()?)
}

/// Human-readable listing of every role's grants
pub fn inspect(path: &Path) -> Result<String> {
    let model = load(path)?;
    let mut out = String::new();

    writeln!(out, "{}", model.name)?;
    for role in model.table.roles() {
        writeln!(out, "  {role}")?;
        for (action, fields) in model.table.actions_for(role.as_str()) {
            let fields: Vec<&str> = fields.iter().collect();
            writeln!(out, "    {action:<8} {}", fields.join(", "))?;
        }
    }

    Ok(out)
}

/// Result of `warden check`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the access was allowed
    pub allowed: bool,
    /// Role that granted it
    pub role: Option<Role>,
    /// Oracle's reason
    pub reason: String,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.allowed, &self.role) {
            (true, Some(role)) => write!(f, "allowed (role: {role})"),
            (true, None) => write!(f, "allowed"),
            (false, _) => write!(f, "denied: {}", self.reason),
        }
    }
}

/// Decide one access for an actor holding `roles`
pub fn check(path: &Path, roles: &[String], action: &str, field: &str) -> Result<Outcome> {
    let model = load(path)?;
    let action = Action::parse(action)?;

    let resolver = roles
        .iter()
        .fold(RoleRules::<(), Model>::new(), |rules, role| {
            rules.role_when(role.as_str(), |_, _| true)
        });
    let oracle = TableOracle::new(resolver);
    let decision = oracle.evaluate(&AccessRequest::new(None::<&()>, &action, &model, field));

    Ok(Outcome {
        allowed: decision.allowed,
        role: decision.matched_role,
        reason: decision.reason,
    })
}
