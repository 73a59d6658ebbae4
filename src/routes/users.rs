use crate::{
    auth::{hash_password, AuthenticatedUser},
    error::AppError,
    models::user::{
        default_modules, ensure_service_note, ModuleVisibility, ModulesUpdate, Role, User, UserInput,
        UserUpdate,
    },
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use validator::Validate;

const USER_COLUMNS: &str = "id, username, role, company_id, modules_config";

fn username_taken(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::BadRequest("Username already exists".into()),
        other => other,
    }
}

/// Lists every account. Password hashes are never selected.
#[get("")]
pub async fn list_users(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY id",
        USER_COLUMNS
    ))
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(users))
}

#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;

    let found = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user_id.into_inner())
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(found))
}

/// Creates an account.
///
/// ## Responses:
/// - `201 Created`: `{id, username, role, company_id}`.
/// - `400 Bad Request`: The username is taken.
/// - `403 Forbidden`: Caller is not an admin.
/// - `422 Unprocessable Entity`: Username or password fails validation.
#[post("")]
pub async fn create_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<UserInput>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    input.validate()?;

    let password_hash = hash_password(&input.password)?;
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (username, password_hash, role, company_id)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(input.username.trim())
    .bind(password_hash)
    .bind(input.role)
    .bind(input.company_id)
    .fetch_one(&**pool)
    .await
    .map_err(username_taken)?;

    log::info!("{} created user {} ({})", user.username, input.username, input.role);

    Ok(HttpResponse::Created().json(json!({
        "id": id,
        "username": input.username.trim(),
        "role": input.role,
        "company_id": input.company_id,
    })))
}

/// Updates an account. The password changes only when a non-empty one is sent.
#[put("/{id}")]
pub async fn update_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
    input: web::Json<UserUpdate>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    input.validate()?;
    let user_id = user_id.into_inner();

    let result = match input.new_password() {
        Some(password) => {
            sqlx::query(
                "UPDATE users SET username = $1, password_hash = $2, role = $3, company_id = $4
                 WHERE id = $5",
            )
            .bind(input.username.trim())
            .bind(hash_password(password)?)
            .bind(input.role)
            .bind(input.company_id)
            .bind(user_id)
            .execute(&**pool)
            .await
        }
        None => {
            sqlx::query(
                "UPDATE users SET username = $1, role = $2, company_id = $3 WHERE id = $4",
            )
            .bind(input.username.trim())
            .bind(input.role)
            .bind(input.company_id)
            .bind(user_id)
            .execute(&**pool)
            .await
        }
    }
    .map_err(username_taken)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "User updated successfully" })))
}

#[delete("/{id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    let user_id = user_id.into_inner();

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&**pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("User has assigned tasks and cannot be deleted".into())
            }
            other => other,
        })?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    log::info!("{} deleted user {}", user.username, user_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}

/// Dashboard modules of an operator. Admins may read anyone's, an operator
/// only their own.
#[get("/{id}/modules")]
pub async fn get_modules(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let user_id = user_id.into_inner();
    if user.role != Role::Admin && user.id != user_id {
        return Err(AppError::Forbidden("Forbidden".into()));
    }

    let row: Option<(Option<Json<Vec<ModuleVisibility>>>,)> =
        sqlx::query_as("SELECT modules_config FROM users WHERE id = $1 AND role = $2")
            .bind(user_id)
            .bind(Role::Operator)
            .fetch_optional(&**pool)
            .await?;

    let (stored,) = row.ok_or_else(|| AppError::NotFound("Operator not found".into()))?;
    let modules = ensure_service_note(stored.map(|json| json.0).unwrap_or_else(default_modules));

    Ok(HttpResponse::Ok().json(json!({ "modules": modules })))
}

#[put("/{id}/modules")]
pub async fn update_modules(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
    input: web::Json<ModulesUpdate>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    let user_id = user_id.into_inner();

    let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&**pool)
        .await?;
    if role != Some(Role::Operator) {
        return Err(AppError::BadRequest("User must be an operator".into()));
    }

    let modules = ensure_service_note(input.into_inner().modules);
    sqlx::query("UPDATE users SET modules_config = $1 WHERE id = $2")
        .bind(Json(&modules))
        .bind(user_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Modules config updated successfully",
        "modules": modules,
    })))
}
