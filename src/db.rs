//! Connection pool, migrations and first-start seed data.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::auth::hash_password;
use crate::error::AppError;
use crate::models::hourly::DEFAULT_COMPANIES;
use crate::models::user::Role;

/// Seeded accounts: username, password, role, company name.
const SEED_USERS: [(&str, &str, Role, Option<&str>); 6] = [
    ("admin", "admin123", Role::Admin, None),
    ("operator", "operator123", Role::Operator, None),
    ("manager_muving", "muving123", Role::Manager, Some("Мувинг")),
    ("manager_esk", "esk123", Role::Manager, Some("ЭСК")),
    ("manager_gradusy", "gradusy123", Role::Manager, Some("Градусы")),
    ("manager_2kolesa", "2kolesa123", Role::Manager, Some("2колеса")),
];

pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts the default companies and accounts. Existing rows are left as
/// they are, so restarts never reset passwords.
pub async fn seed(pool: &PgPool) -> Result<(), AppError> {
    for name in DEFAULT_COMPANIES {
        sqlx::query("INSERT INTO companies (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (username, password, role, company) in SEED_USERS {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }

        let company_id: Option<i32> = match company {
            Some(name) => sqlx::query_scalar("SELECT id FROM companies WHERE name = $1")
                .bind(name)
                .fetch_optional(pool)
                .await?,
            None => None,
        };

        sqlx::query(
            "INSERT INTO users (username, password_hash, role, company_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(username)
        .bind(hash_password(password)?)
        .bind(role)
        .bind(company_id)
        .execute(pool)
        .await?;
        log::info!("seeded user {} ({})", username, role);
    }
    Ok(())
}
