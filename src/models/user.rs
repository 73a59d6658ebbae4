use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Dashboard role of an account.
/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user and company management.
    Admin,
    /// Shift operator: edits counters, creates tasks, runs the TSD desk.
    Operator,
    /// Company manager: sees and edits only their own company.
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            "manager" => Ok(Role::Manager),
            other => Err(format!("unknown role {:?}", other)),
        }
    }
}

/// Visibility of one operator dashboard block.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ModuleVisibility {
    pub id: String,
    pub visible: bool,
}

/// Module that every operator dashboard must carry.
pub const SERVICE_NOTE_MODULE: &str = "serviceNote";

/// Dashboard blocks shown to an operator with no stored configuration.
pub fn default_modules() -> Vec<ModuleVisibility> {
    ["summary", "analyz", "reports", SERVICE_NOTE_MODULE]
        .iter()
        .map(|id| ModuleVisibility {
            id: id.to_string(),
            visible: true,
        })
        .collect()
}

/// Appends the service-note block when an older stored config lacks it.
pub fn ensure_service_note(mut modules: Vec<ModuleVisibility>) -> Vec<ModuleVisibility> {
    if !modules.iter().any(|m| m.id == SERVICE_NOTE_MODULE) {
        modules.push(ModuleVisibility {
            id: SERVICE_NOTE_MODULE.to_string(),
            visible: true,
        });
    }
    modules
}

/// A user account as returned by the API. The password hash never leaves the database layer.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub company_id: Option<i32>,
    pub modules_config: Option<Json<Vec<ModuleVisibility>>>,
}

/// Row used by the login flow.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub company_id: Option<i32>,
}

/// Payload for creating a user.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub role: Role,
    pub company_id: Option<i32>,
}

/// Payload for updating a user. An absent or empty password keeps the current one.
#[derive(Debug, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    pub password: Option<String>,
    pub role: Role,
    pub company_id: Option<i32>,
}

impl UserUpdate {
    /// The new password, if the caller actually supplied one.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ModulesUpdate {
    pub modules: Vec<ModuleVisibility>,
}
