use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        hourly::{OperationInput, Shift},
        user::Role,
    },
};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use chrono::Local;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Operation types a company has counters for, sorted.
#[get("/{company_id}")]
pub async fn list_operations(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    company_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let company_id = company_id.into_inner();
    user.require_company(company_id)?;

    let operations: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT operation_type FROM hourly_data WHERE company_id = $1 ORDER BY operation_type",
    )
    .bind(company_id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(operations))
}

/// Adds an operation to a company by creating empty counters for every
/// day-shift hour of today. Existing counters are kept.
#[post("/{company_id}")]
pub async fn add_operation(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    company_id: web::Path<i32>,
    input: web::Json<OperationInput>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    input.validate()?;
    let company_id = company_id.into_inner();
    let operation = input.operation_type.trim();
    if operation.is_empty() {
        return Err(AppError::ValidationError("Operation type required".into()));
    }

    let today = Local::now().date_naive();
    let mut tx = pool.begin().await?;
    for slot in Shift::Day.slots(today) {
        sqlx::query(
            "INSERT INTO hourly_data (company_id, operation_type, hour, value)
             VALUES ($1, $2, $3, 0)
             ON CONFLICT (company_id, operation_type, hour) DO NOTHING",
        )
        .bind(company_id)
        .bind(operation)
        .bind(slot)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    log::info!("{} added operation {:?} to company {}", user.username, operation, company_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Operation added successfully" })))
}

/// Removes every counter of an operation from a company.
#[delete("/{company_id}/{operation_type}")]
pub async fn delete_operation(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    path: web::Path<(i32, String)>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    let (company_id, operation_type) = path.into_inner();

    let result = sqlx::query("DELETE FROM hourly_data WHERE company_id = $1 AND operation_type = $2")
        .bind(company_id)
        .bind(&operation_type)
        .execute(&**pool)
        .await?;

    log::info!(
        "{} deleted operation {:?} of company {} ({} rows)",
        user.username,
        operation_type,
        company_id,
        result.rows_affected()
    );
    Ok(HttpResponse::Ok().json(json!({ "message": "Operation deleted successfully" })))
}
