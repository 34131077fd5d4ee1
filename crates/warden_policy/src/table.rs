//! Normalized permission tables.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_core::{Action, FieldSet, Role, WardenError, WardenResult};

use crate::declarative::{DeclarativeInput, RoleGrant, Rule};

static NO_FIELDS: Lazy<FieldSet> = Lazy::new(FieldSet::new);

/// Normalized `role -> action -> fields` table for one model.
///
/// Built once and shared by every instance of the model. Nothing needs to
/// be interpreted at check time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable {
    roles: IndexMap<Role, IndexMap<Action, FieldSet>>,
}

/// Something that carries a permission table, usually a model type whose
/// table lives in a `static`.
pub trait Permissioned {
    /// Model name used in errors and logs
    fn model_name(&self) -> &str;

    /// The model's permission table
    fn permissions(&self) -> &PermissionTable;
}

impl PermissionTable {
    /// Start a typed builder
    #[must_use]
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    /// Normalize declarative input.
    ///
    /// Public fields for an action are copied into every other role's
    /// `(actions, fields)` rule for that action. `"*"` roles receive every
    /// action of the universe: the explicit `actions` list when given,
    /// otherwise CRUD plus every custom action named in the input.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty action or field names.
    pub fn build(input: DeclarativeInput) -> WardenResult<Self> {
        validate(&input)?;

        let mut table = Self::default();
        let public = Role::public();

        for rules in input.public.values() {
            for rule in rules {
                table.apply_rule(&public, rule, None);
            }
        }

        let universe = match &input.actions {
            Some(actions) => actions.iter().cloned().collect(),
            None => action_universe(&input),
        };

        let public_grants = table.roles.get(&public).cloned().unwrap_or_default();

        for (role, grant) in &input.roles {
            match grant {
                RoleGrant::All => {
                    let entry = table.roles.entry(role.clone()).or_default();
                    for action in &universe {
                        entry.insert(action.clone(), FieldSet::all());
                    }
                }
                RoleGrant::Table(actions) => {
                    let entry = table.roles.entry(role.clone()).or_default();
                    for (action, fields) in actions {
                        entry.entry(action.clone()).or_default().extend_from(fields);
                    }
                }
                RoleGrant::Rules(rules) => {
                    table.roles.entry(role.clone()).or_default();
                    for rule in rules {
                        table.apply_rule(role, rule, Some(&public_grants));
                    }
                }
            }
        }

        tracing::debug!(
            roles = table.roles.len(),
            actions = table.actions().len(),
            "normalized permission table"
        );

        Ok(table)
    }

    /// Parse a declarative JSON value and normalize it
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed input
    pub fn from_value(value: &Value) -> WardenResult<Self> {
        Self::build(DeclarativeInput::from_value(value)?)
    }

    /// Parse declarative JSON text and normalize it
    ///
    /// # Errors
    ///
    /// Returns an error for invalid JSON or malformed input
    pub fn from_json(json: &str) -> WardenResult<Self> {
        Self::build(DeclarativeInput::from_json(json)?)
    }

    /// Normalized form as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json_pretty(&self) -> WardenResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn apply_rule(&mut self, role: &Role, rule: &Rule, public: Option<&IndexMap<Action, FieldSet>>) {
        let entry = self.roles.entry(role.clone()).or_default();
        match rule {
            Rule::Action(action) => {
                entry.entry(action.clone()).or_default().insert(warden_core::WILDCARD);
            }
            Rule::Grant { actions, fields } => {
                for action in actions {
                    let granted = entry.entry(action.clone()).or_default();
                    granted.extend_from(fields);
                    if let Some(public_fields) = public.and_then(|p| p.get(action)) {
                        granted.extend_from(public_fields);
                    }
                }
            }
        }
    }

    /// Roles named in the table, in declaration order
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.keys()
    }

    /// Whether the table names `role`
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Every action granted to at least one role, sorted
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        let mut actions: Vec<Action> = self
            .roles
            .values()
            .flat_map(|grants| grants.keys().cloned())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        actions.sort();
        actions
    }

    /// Actions granted to one role, in declaration order
    pub fn actions_for(&self, role: &str) -> impl Iterator<Item = (&Action, &FieldSet)> {
        self.roles.get(role).into_iter().flat_map(|grants| grants.iter())
    }

    /// Fields `role` may perform `action` on. Empty when the table grants
    /// nothing.
    #[must_use]
    pub fn authorized_fields(&self, role: &str, action: &Action) -> &FieldSet {
        self.roles
            .get(role)
            .and_then(|grants| grants.get(action))
            .unwrap_or(&*NO_FIELDS)
    }

    /// Whether `role` may perform `action` on `field`, treating `"*"` as any
    /// field
    #[must_use]
    pub fn permits(&self, role: &str, action: &Action, field: &str) -> bool {
        self.authorized_fields(role, action).permits(field)
    }

    /// Whether the table names no roles
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

fn validate(input: &DeclarativeInput) -> WardenResult<()> {
    let rules = input
        .public
        .values()
        .flatten()
        .chain(input.roles.values().flat_map(|grant| match grant {
            RoleGrant::Rules(rules) => rules.as_slice(),
            _ => &[][..],
        }));

    for rule in rules {
        if rule.actions().any(|action| action.as_str().is_empty()) {
            return Err(WardenError::configuration("action name must not be empty"));
        }
        if let Rule::Grant { fields, .. } = rule
            && fields.iter().any(str::is_empty)
        {
            return Err(WardenError::configuration("field name must not be empty"));
        }
    }

    for (role, grant) in &input.roles {
        if role.as_str().is_empty() {
            return Err(WardenError::configuration("role name must not be empty"));
        }
        if let RoleGrant::Table(actions) = grant
            && actions.values().any(|fields| fields.iter().any(str::is_empty))
        {
            return Err(WardenError::configuration(format!(
                "field name must not be empty (role '{role}')"
            )));
        }
    }

    Ok(())
}

fn action_universe(input: &DeclarativeInput) -> IndexSet<Action> {
    let mut universe: IndexSet<Action> = Action::CRUD.into_iter().collect();

    for rules in input.public.values() {
        universe.extend(rules.iter().flat_map(Rule::actions).cloned());
    }
    for grant in input.roles.values() {
        match grant {
            RoleGrant::All => {}
            RoleGrant::Rules(rules) => {
                universe.extend(rules.iter().flat_map(Rule::actions).cloned());
            }
            RoleGrant::Table(actions) => universe.extend(actions.keys().cloned()),
        }
    }

    universe
}

/// Typed builder mirroring the declarative JSON shape
#[derive(Debug, Clone, Default)]
pub struct PermissionTableBuilder {
    input: DeclarativeInput,
}

impl PermissionTableBuilder {
    /// Grant `action` on `fields` to the `public` role
    #[must_use]
    pub fn public<F, S>(mut self, action: Action, fields: F) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = Rule::grant([action.clone()], fields);
        self.input.public.entry(action).or_default().push(rule);
        self
    }

    /// Append rules for `role`
    #[must_use]
    pub fn role(mut self, role: impl Into<Role>, rules: impl IntoIterator<Item = Rule>) -> Self {
        let role = role.into();
        let rules: Vec<Rule> = rules.into_iter().collect();
        match self.input.roles.get_mut(&role) {
            Some(RoleGrant::Rules(existing)) => existing.extend(rules),
            Some(_) => {}
            None => {
                self.input.roles.insert(role, RoleGrant::Rules(rules));
            }
        }
        self
    }

    /// Grant every action on every field to `role`
    #[must_use]
    pub fn role_all(mut self, role: impl Into<Role>) -> Self {
        self.input.roles.insert(role.into(), RoleGrant::All);
        self
    }

    /// Fix the action universe used to expand [`role_all`](Self::role_all)
    #[must_use]
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.input.actions = Some(actions.into_iter().collect());
        self
    }

    /// Normalize into a table
    ///
    /// # Errors
    ///
    /// Returns a configuration error for malformed input
    pub fn build(self) -> WardenResult<PermissionTable> {
        PermissionTable::build(self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::WILDCARD;

    fn user_table() -> PermissionTable {
        PermissionTable::from_value(&json!({
            "read": ["id", "username"],
            "self": [[["create", "update"], ["username", "fullname"]], "read", "delete", "custom_action"],
            "friend": [["read", ["fullname"]]],
            "admin": "*"
        }))
        .unwrap()
    }

    fn fields(table: &PermissionTable, role: &str, action: Action) -> Vec<String> {
        table
            .authorized_fields(role, &action)
            .iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_normalizes_user_example() {
        let table = user_table();
        let custom = Action::Custom("custom_action".to_string());

        assert_eq!(fields(&table, "public", Action::Read), vec!["id", "username"]);
        assert_eq!(fields(&table, "friend", Action::Read), vec!["fullname", "id", "username"]);
        assert_eq!(fields(&table, "self", Action::Create), vec!["username", "fullname"]);
        assert_eq!(fields(&table, "self", Action::Update), vec!["username", "fullname"]);
        assert_eq!(fields(&table, "self", Action::Read), vec![WILDCARD]);
        assert_eq!(fields(&table, "self", Action::Delete), vec![WILDCARD]);
        assert_eq!(fields(&table, "self", custom.clone()), vec![WILDCARD]);

        for action in [Action::Create, Action::Read, Action::Update, Action::Delete, custom] {
            assert_eq!(fields(&table, "admin", action), vec![WILDCARD]);
        }
    }

    #[test]
    fn test_roles_in_declaration_order() {
        let table = user_table();
        let roles: Vec<&str> = table.roles().map(Role::as_str).collect();
        assert_eq!(roles, vec!["public", "self", "friend", "admin"]);
    }

    #[test]
    fn test_actions_union() {
        let table = user_table();
        assert_eq!(
            table.actions(),
            vec![
                Action::Create,
                Action::Read,
                Action::Update,
                Action::Delete,
                Action::Custom("custom_action".to_string()),
            ]
        );
    }

    #[test]
    fn test_shorthand_equivalence() {
        let flat = PermissionTable::from_value(&json!({ "read": ["a", "b"] })).unwrap();
        let paired = PermissionTable::from_value(&json!({ "read": [[["read"], ["a", "b"]]] })).unwrap();
        assert_eq!(flat, paired);
    }

    #[test]
    fn test_builder_matches_json() {
        let built = PermissionTable::builder()
            .public(Action::Read, ["id", "username"])
            .role(
                "self",
                [
                    Rule::grant([Action::Create, Action::Update], ["username", "fullname"]),
                    Rule::Action(Action::Read),
                    Rule::Action(Action::Delete),
                    Rule::Action(Action::Custom("custom_action".to_string())),
                ],
            )
            .role("friend", [Rule::grant([Action::Read], ["fullname"])])
            .role_all("admin")
            .build()
            .unwrap();

        assert_eq!(built, user_table());
    }

    #[test]
    fn test_explicit_action_universe() {
        let table = PermissionTable::builder()
            .actions([Action::Read])
            .role_all("admin")
            .build()
            .unwrap();

        assert!(table.permits("admin", &Action::Read, "anything"));
        assert!(!table.permits("admin", &Action::Delete, "anything"));
    }

    #[test]
    fn test_missing_role_or_action_is_empty() {
        let table = user_table();
        assert!(table.authorized_fields("stranger", &Action::Read).is_empty());
        assert!(table.authorized_fields("friend", &Action::Delete).is_empty());
        assert!(!table.permits("stranger", &Action::Read, "id"));
    }

    #[test]
    fn test_permits_wildcard() {
        let table = user_table();
        assert!(table.permits("self", &Action::Read, "ssn"));
        assert!(table.permits("self", &Action::Delete, WILDCARD));
        assert!(!table.permits("friend", &Action::Read, "ssn"));
        assert!(!table.permits("friend", &Action::Read, WILDCARD));
    }

    #[test]
    fn test_later_rules_extend_earlier_ones() {
        let table = PermissionTable::from_value(&json!({
            "editor": [["update", ["title"]], ["update", ["body"]]]
        }))
        .unwrap();
        assert_eq!(fields(&table, "editor", Action::Update), vec!["title", "body"]);
    }

    #[test]
    fn test_empty_public_list_denies() {
        let table = PermissionTable::from_value(&json!({ "read": [] })).unwrap();
        assert!(table.has_role("public"));
        assert!(table.authorized_fields("public", &Action::Read).is_empty());
    }

    #[test]
    fn test_normalized_json_reparses_identically() {
        let table = user_table();
        let json = table.to_json_pretty().unwrap();
        let again = PermissionTable::from_json(&json).unwrap();
        assert_eq!(table, again);

        let typed: PermissionTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table, typed);
    }

    #[test]
    fn test_role_with_no_actions_is_kept() {
        let table = PermissionTable::from_value(&json!({ "auditor": [] })).unwrap();
        assert!(table.has_role("auditor"));
        assert_eq!(table.actions_for("auditor").count(), 0);
    }

    #[test]
    fn test_builder_rejects_empty_field() {
        let err = PermissionTable::builder()
            .role("self", [Rule::grant([Action::Update], [""])])
            .build()
            .unwrap_err();
        assert!(matches!(err, WardenError::Configuration { .. }));
    }

    #[test]
    fn test_rejects_empty_field_in_mapping_grant() {
        let mut input = DeclarativeInput::default();
        input.roles.insert(
            Role::new("friend"),
            RoleGrant::Table(IndexMap::from([(Action::Read, ["id", ""].into_iter().collect())])),
        );

        let err = PermissionTable::build(input).unwrap_err();
        assert!(err.to_string().contains("friend"));
    }

    #[test]
    fn test_malformed_input_is_configuration_error() {
        let err = PermissionTable::from_value(&json!({ "self": [["read"]] })).unwrap_err();
        assert!(matches!(err, WardenError::Configuration { .. }));
    }

    proptest::proptest! {
        #[test]
        fn prop_listed_fields_permitted(
            listed in proptest::collection::vec("[a-z]{1,8}", 0..6),
            probe in "[a-z]{1,8}",
        ) {
            let table = PermissionTable::builder()
                .role("owner", [Rule::grant([Action::Update], listed.clone())])
                .build()
                .unwrap();

            let expected = listed.contains(&probe);
            proptest::prop_assert_eq!(table.permits("owner", &Action::Update, &probe), expected);
            proptest::prop_assert!(!table.permits("owner", &Action::Read, &probe));
        }

        #[test]
        fn prop_shorthand_equivalence(listed in proptest::collection::vec("[a-z]{1,8}", 0..6)) {
            let flat = PermissionTable::from_value(&json!({ "read": listed })).unwrap();
            let paired = PermissionTable::from_value(&json!({ "read": [[["read"], listed]] })).unwrap();
            proptest::prop_assert_eq!(flat, paired);
        }
    }
}
