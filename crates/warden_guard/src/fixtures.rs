//! Test models shared by the guard tests.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use warden_core::{WardenError, WardenResult};
use warden_policy::{PermissionTable, Permissioned, RoleRules};

use crate::actor::FixedActor;
use crate::guard::Guard;
use crate::resource::Resource;

pub static USER_PERMISSIONS: Lazy<PermissionTable> = Lazy::new(|| {
    PermissionTable::from_value(&json!({
        "read": ["id", "username"],
        "self": [
            [["create", "update"], ["username", "fullname"]],
            "read",
            ["delete", ["fullname"]]
        ],
        "admin": "*"
    }))
    .expect("valid user permissions")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub admin: bool,
}

impl Viewer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            admin: false,
        }
    }

    pub fn admin(id: &str) -> Self {
        Self {
            id: id.to_string(),
            admin: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub fullname: Option<String>,
}

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        fullname: Some(format!("{username} example")),
    }
}

impl Permissioned for User {
    fn model_name(&self) -> &str {
        "User"
    }

    fn permissions(&self) -> &PermissionTable {
        &USER_PERMISSIONS
    }
}

impl Resource for User {
    fn field_names(&self) -> Vec<String> {
        ["id", "username", "fullname"].map(String::from).to_vec()
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.clone())),
            "username" => Some(Value::String(self.username.clone())),
            "fullname" => Some(self.fullname.clone().map_or(Value::Null, Value::String)),
            _ => None,
        }
    }

    fn write_field(&mut self, field: &str, value: Value) -> WardenResult<()> {
        match (field, value) {
            ("id", Value::String(id)) => self.id = id,
            ("username", Value::String(username)) => self.username = username,
            ("fullname", Value::String(fullname)) => self.fullname = Some(fullname),
            ("fullname", Value::Null) => self.fullname = None,
            ("id" | "username" | "fullname", other) => {
                return Err(WardenError::field("User", field, format!("expected a string, got {other}")));
            }
            _ => return Err(WardenError::field("User", field, "no such field")),
        }
        Ok(())
    }

    fn clear_field(&mut self, field: &str) -> WardenResult<()> {
        match field {
            "fullname" => {
                self.fullname = None;
                Ok(())
            }
            "id" | "username" => Err(WardenError::field("User", field, "field is required")),
            _ => Err(WardenError::field("User", field, "no such field")),
        }
    }
}

pub fn user_rules() -> RoleRules<Viewer, User> {
    RoleRules::new()
        .public()
        .role("self", |viewer: &Viewer, target: &User| viewer.id == target.id)
        .role("admin", |viewer: &Viewer, _: &User| viewer.admin)
}

pub fn user_guard(viewer: Option<Viewer>) -> Guard<Viewer, User> {
    Guard::with_roles(user_rules(), FixedActor::from(viewer))
}

/// Untyped record carrying its own table
#[derive(Debug, Clone)]
pub struct Record {
    pub table: PermissionTable,
    pub values: IndexMap<String, Value>,
}

impl Permissioned for Record {
    fn model_name(&self) -> &str {
        "Record"
    }

    fn permissions(&self) -> &PermissionTable {
        &self.table
    }
}

impl Resource for Record {
    fn field_names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn read_field(&self, field: &str) -> Option<Value> {
        self.values.get(field).cloned()
    }

    fn write_field(&mut self, field: &str, value: Value) -> WardenResult<()> {
        match self.values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(WardenError::field("Record", field, "no such field")),
        }
    }

    fn clear_field(&mut self, field: &str) -> WardenResult<()> {
        self.write_field(field, Value::Null)
    }
}
