use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        company::{CompanyActiveInput, CompanyInput},
        user::Role,
        Company,
    },
};
use actix_web::{get, patch, post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Lists the companies that are not hidden, by name.
#[get("")]
pub async fn list_companies(pool: web::Data<PgPool>) -> Result<impl Responder, AppError> {
    let companies = sqlx::query_as::<_, Company>(
        "SELECT id, name, is_active FROM companies WHERE is_active ORDER BY name",
    )
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(companies))
}

/// Creates a company.
///
/// ## Responses:
/// - `201 Created`: The new `Company`.
/// - `400 Bad Request`: A company with this name already exists.
/// - `422 Unprocessable Entity`: The trimmed name is empty.
#[post("")]
pub async fn create_company(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<CompanyInput>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    let input = input.into_inner().trimmed();
    input.validate()?;

    let company = sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, is_active) VALUES ($1, TRUE) RETURNING id, name, is_active",
    )
    .bind(&input.name)
    .fetch_one(&**pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::BadRequest("Company with this name already exists".into())
        }
        other => other,
    })?;

    log::info!("{} created company {}", user.username, company.name);
    Ok(HttpResponse::Created().json(company))
}

/// Hides or shows a company instead of deleting it.
#[patch("/{id}/active")]
pub async fn set_company_active(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    company_id: web::Path<i32>,
    input: web::Json<CompanyActiveInput>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    let company_id = company_id.into_inner();
    let active = input.is_active.is_active();

    let result = sqlx::query("UPDATE companies SET is_active = $1 WHERE id = $2")
        .bind(active)
        .bind(company_id)
        .execute(&**pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Company not found".into()));
    }

    log::info!("company {} is_active={}", company_id, active);
    Ok(HttpResponse::Ok().json(json!({ "message": "Company visibility updated" })))
}
