//! Declarative permission input.
//!
//! The convenience shape a model author writes, before normalization:
//!
//! ```json
//! {
//!     "read": ["id", "username"],
//!     "self": [[["create", "update"], ["username", "fullname"]], "read", "delete"],
//!     "friend": [["read", ["fullname"]]],
//!     "admin": "*"
//! }
//! ```
//!
//! Keys naming a CRUD action grant to the `public` role. Every other key is a
//! role. The optional `actions` key fixes the action universe used to expand
//! `"*"` roles.

use indexmap::IndexMap;
use serde_json::Value;
use warden_core::{Action, FieldSet, Role, WILDCARD, WardenError, WardenResult};

/// Top-level key that fixes the action universe
pub const ACTIONS_KEY: &str = "actions";

/// One entry in a role's rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Allow this action on every field
    Action(Action),
    /// Allow each of `actions` on `fields`
    Grant {
        /// Actions granted
        actions: Vec<Action>,
        /// Fields they apply to
        fields: FieldSet,
    },
}

impl Rule {
    /// Shorthand for [`Rule::Grant`]
    #[must_use]
    pub fn grant<A, F, S>(actions: A, fields: F) -> Self
    where
        A: IntoIterator<Item = Action>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Grant {
            actions: actions.into_iter().collect(),
            fields: fields.into_iter().collect(),
        }
    }

    /// Actions named by this rule
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        let (single, many) = match self {
            Self::Action(action) => (Some(action), &[][..]),
            Self::Grant { actions, .. } => (None, actions.as_slice()),
        };
        single.into_iter().chain(many.iter())
    }
}

/// What a role is granted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrant {
    /// `"*"`: every known action on every field
    All,
    /// A list of rules to expand
    Rules(Vec<Rule>),
    /// An already-normalized `action -> fields` mapping, taken as is
    Table(IndexMap<Action, FieldSet>),
}

/// Unnormalized permission input for one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarativeInput {
    /// Explicit action universe; defaults to CRUD plus custom actions found
    pub actions: Option<Vec<Action>>,
    /// Rules granted to the `public` role, keyed by the action they were
    /// declared under
    pub public: IndexMap<Action, Vec<Rule>>,
    /// Per-role grants in declaration order
    pub roles: IndexMap<Role, RoleGrant>,
}

impl DeclarativeInput {
    /// Parse the JSON shape described in the module docs.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when an entry is neither a recognized
    /// shorthand string, a list of field names, a mapping, nor a 2-element
    /// `(actions, fields)` pair.
    pub fn from_value(value: &Value) -> WardenResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| WardenError::configuration("permissions must be a mapping of roles"))?;

        let mut input = Self::default();

        for (key, entry) in object {
            if key == ACTIONS_KEY {
                input.actions = Some(parse_action_list(entry, "actions")?);
                continue;
            }

            let action = Action::parse(key)?;
            if action.is_crud() {
                input.public.insert(action.clone(), parse_public(&action, entry)?);
            } else {
                input.roles.insert(Role::new(key.as_str()), parse_role(key, entry)?);
            }
        }

        Ok(input)
    }

    /// Parse from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or not a valid declaration
    pub fn from_json(json: &str) -> WardenResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }
}

/// A public action key: a flat list of fields, pairs, or both
fn parse_public(action: &Action, entry: &Value) -> WardenResult<Vec<Rule>> {
    let items = entry.as_array().ok_or_else(|| {
        WardenError::configuration(format!(
            "public '{action}' permissions must be a list of fields or (actions, fields) pairs"
        ))
    })?;

    let mut plain = FieldSet::new();
    let mut rules = Vec::new();

    for item in items {
        match item {
            Value::String(field) => {
                plain.insert(parse_field(field)?);
            }
            Value::Array(_) => rules.push(parse_pair(action.as_str(), item)?),
            other => {
                return Err(WardenError::configuration(format!(
                    "invalid public '{action}' entry: {other}"
                )));
            }
        }
    }

    if !plain.is_empty() || rules.is_empty() {
        rules.insert(
            0,
            Rule::Grant {
                actions: vec![action.clone()],
                fields: plain,
            },
        );
    }

    Ok(rules)
}

fn parse_role(role: &str, entry: &Value) -> WardenResult<RoleGrant> {
    match entry {
        Value::String(s) if s == WILDCARD => Ok(RoleGrant::All),
        Value::String(s) => Err(WardenError::configuration(format!(
            "role '{role}' grant must be \"*\", a rule list or a mapping, got \"{s}\""
        ))),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Action::parse(name).map(Rule::Action),
                Value::Array(_) => parse_pair(role, item),
                other => Err(WardenError::configuration(format!(
                    "invalid rule for role '{role}': {other}"
                ))),
            })
            .collect::<WardenResult<Vec<_>>>()
            .map(RoleGrant::Rules),
        Value::Object(map) => {
            let mut table = IndexMap::new();
            for (action, fields) in map {
                let fields = parse_field_list(fields, role)?;
                table.insert(Action::parse(action)?, fields);
            }
            Ok(RoleGrant::Table(table))
        }
        other => Err(WardenError::configuration(format!(
            "invalid grant for role '{role}': {other}"
        ))),
    }
}

/// `[actions, fields]` where `actions` is a name or a list of names and
/// `fields` is a name or a list of names
fn parse_pair(owner: &str, item: &Value) -> WardenResult<Rule> {
    let pair = item
        .as_array()
        .filter(|pair| pair.len() == 2)
        .ok_or_else(|| {
            WardenError::configuration(format!(
                "invalid permission shorthand for '{owner}': expected a 2-element (actions, fields) pair, got {item}"
            ))
        })?;

    let actions = match &pair[0] {
        Value::String(name) => vec![Action::parse(name)?],
        other => parse_action_list(other, owner)?,
    };
    let fields = match &pair[1] {
        Value::String(field) => std::iter::once(parse_field(field)?).collect(),
        other => parse_field_list(other, owner)?,
    };

    Ok(Rule::Grant { actions, fields })
}

fn parse_action_list(value: &Value, owner: &str) -> WardenResult<Vec<Action>> {
    string_list(value, owner, "action")?
        .into_iter()
        .map(Action::parse)
        .collect()
}

fn parse_field_list(value: &Value, owner: &str) -> WardenResult<FieldSet> {
    string_list(value, owner, "field")?
        .into_iter()
        .map(parse_field)
        .collect()
}

fn parse_field(name: &str) -> WardenResult<&str> {
    if name.is_empty() {
        return Err(WardenError::configuration("field name must not be empty"));
    }
    Ok(name)
}

fn string_list<'v>(value: &'v Value, owner: &str, what: &str) -> WardenResult<Vec<&'v str>> {
    let items = value.as_array().ok_or_else(|| {
        WardenError::configuration(format!("expected a list of {what} names for '{owner}', got {value}"))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().ok_or_else(|| {
                WardenError::configuration(format!("expected a {what} name for '{owner}', got {item}"))
            })
        })
        .collect()
}
