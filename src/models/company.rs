use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Contractor company whose staff work the warehouse floor.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompanyInput {
    #[validate(length(min = 1, max = 100, message = "Company name required"))]
    pub name: String,
}

impl CompanyInput {
    pub fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// The active flag arrives either as a JSON boolean or as `0`/`1`.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(untagged)]
pub enum ActiveFlag {
    Bool(bool),
    Number(i64),
}

impl ActiveFlag {
    pub fn is_active(self) -> bool {
        match self {
            ActiveFlag::Bool(b) => b,
            ActiveFlag::Number(n) => n != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompanyActiveInput {
    pub is_active: ActiveFlag,
}

/// Number of company staff on shift for a given date.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct CompanyEmployees {
    pub company_id: i32,
    pub company_name: String,
    pub date: NaiveDate,
    pub employees_count: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmployeesCountInput {
    #[validate(range(min = 0, max = 10000))]
    #[serde(default)]
    pub employees_count: i32,
}
