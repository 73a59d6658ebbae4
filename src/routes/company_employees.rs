use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{company::EmployeesCountInput, hourly::Shift, user::Role, CompanyEmployees},
};
use actix_web::{get, post, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Staff counts are kept per shift; after midnight the night shift still
/// belongs to the previous day.
fn shift_day() -> NaiveDate {
    Shift::start_date(Local::now().naive_local())
}

/// Staff on shift today for every visible company; companies without an
/// entry report zero.
#[get("")]
pub async fn list_employees(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    let today = shift_day();

    let rows = sqlx::query_as::<_, CompanyEmployees>(
        "SELECT c.id AS company_id, c.name AS company_name, $1::DATE AS date,
                COALESCE(ce.employees_count, 0) AS employees_count
         FROM companies c
         LEFT JOIN company_employees ce ON ce.company_id = c.id AND ce.date = $1
         WHERE c.is_active
         ORDER BY c.name",
    )
    .bind(today)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Staff count of one company for today.
#[get("/{company_id}")]
pub async fn get_employees(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    company_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let company_id = company_id.into_inner();
    user.require_company(company_id)?;

    let count: Option<i32> = sqlx::query_scalar(
        "SELECT employees_count FROM company_employees WHERE company_id = $1 AND date = $2",
    )
    .bind(company_id)
    .bind(shift_day())
    .fetch_optional(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "employees_count": count.unwrap_or(0) })))
}

#[post("/{company_id}")]
pub async fn set_employees(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    company_id: web::Path<i32>,
    input: web::Json<EmployeesCountInput>,
) -> Result<impl Responder, AppError> {
    let company_id = company_id.into_inner();
    user.require_company(company_id)?;
    input.validate()?;

    sqlx::query(
        "INSERT INTO company_employees (company_id, date, employees_count)
         VALUES ($1, $2, $3)
         ON CONFLICT (company_id, date) DO UPDATE SET employees_count = EXCLUDED.employees_count",
    )
    .bind(company_id)
    .bind(shift_day())
    .bind(input.employees_count)
    .execute(&**pool)
    .await?;

    log::info!(
        "{} set staff of company {} to {}",
        user.username,
        company_id,
        input.employees_count
    );
    Ok(HttpResponse::Ok().json(json!({ "message": "Employees count saved" })))
}
