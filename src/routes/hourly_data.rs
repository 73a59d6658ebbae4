use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        hourly::{parse_hour_slot, BulkHourlyInput, HourlyInput, HourlyQuery, Shift},
        user::Role,
        HourlyData,
    },
    summary::{build_summary, CounterCell},
};
use actix_web::{get, post, put, web, HttpResponse, Responder};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use validator::Validate;

const UPSERT_SQL: &str = "INSERT INTO hourly_data (company_id, operation_type, hour, value)
     VALUES ($1, $2, $3, $4)
     ON CONFLICT (company_id, operation_type, hour) DO UPDATE SET value = EXCLUDED.value";

fn hour_from_path(raw: &str) -> Result<NaiveDateTime, AppError> {
    parse_hour_slot(raw).ok_or_else(|| AppError::BadRequest(format!("Invalid hour: {}", raw)))
}

fn hour_of(input: &HourlyInput) -> Result<NaiveDateTime, AppError> {
    input.hour_slot().ok_or_else(|| {
        AppError::ValidationError(format!("hour: invalid hour slot {:?}", input.hour))
    })
}

/// Counter rows of one hour.
///
/// A manager only ever sees their own company; others may narrow the result
/// with `company_id`.
#[get("/{hour}")]
pub async fn get_hour(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    hour: web::Path<String>,
    query: web::Query<HourlyQuery>,
) -> Result<impl Responder, AppError> {
    let hour = hour_from_path(&hour)?;
    let company_filter = if user.is_manager() {
        Some(user.company_id.unwrap_or(-1))
    } else {
        query.company_id
    };

    let rows = sqlx::query_as::<_, HourlyData>(
        "SELECT hd.id, hd.company_id, c.name AS company_name, hd.operation_type, hd.hour, hd.value
         FROM hourly_data hd
         JOIN companies c ON hd.company_id = c.id
         WHERE hd.hour = $1 AND ($2::INT IS NULL OR hd.company_id = $2)
         ORDER BY c.name, hd.operation_type",
    )
    .bind(hour)
    .bind(company_filter)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Operation × company matrix of one hour with the staff balance.
#[get("/summary/{hour}")]
pub async fn get_summary(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    hour: web::Path<String>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    let hour = hour_from_path(&hour)?;

    let cells: Vec<(String, String, i32)> = sqlx::query_as(
        "SELECT hd.operation_type, c.name, hd.value
         FROM hourly_data hd
         JOIN companies c ON hd.company_id = c.id
         WHERE hd.hour = $1",
    )
    .bind(hour)
    .fetch_all(&**pool)
    .await?;

    let companies: Vec<String> = sqlx::query_scalar("SELECT name FROM companies ORDER BY name")
        .fetch_all(&**pool)
        .await?;

    let staff: Vec<(String, i32)> = sqlx::query_as(
        "SELECT c.name, ce.employees_count
         FROM company_employees ce
         JOIN companies c ON ce.company_id = c.id
         WHERE ce.date = $1",
    )
    .bind(Shift::start_date(hour))
    .fetch_all(&**pool)
    .await?;

    let cells: Vec<CounterCell> = cells
        .into_iter()
        .map(|(operation_type, company_name, value)| CounterCell {
            operation_type,
            company_name,
            value,
        })
        .collect();
    let staff: HashMap<String, i32> = staff.into_iter().collect();

    Ok(HttpResponse::Ok().json(build_summary(hour, &companies, &cells, &staff)))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<NaiveDate>,
    pub shift: Option<Shift>,
}

/// Hour slots of a shift. Without parameters this is the shift on the floor
/// right now.
#[get("/schedule")]
pub async fn get_schedule(query: web::Query<ScheduleQuery>) -> impl Responder {
    let now = Local::now().naive_local();
    let shift = query.shift.unwrap_or_else(|| Shift::at(now.time()));
    let date = query.date.unwrap_or_else(|| match shift {
        Shift::Night => Shift::start_date(now),
        Shift::Day => now.date(),
    });

    HttpResponse::Ok().json(json!({
        "shift": shift,
        "date": date,
        "hours": shift.slots(date),
    }))
}

/// Sets one counter cell.
///
/// ## Responses:
/// - `200 OK`: The value was stored.
/// - `403 Forbidden`: A manager wrote to another company.
/// - `422 Unprocessable Entity`: Missing operation or malformed hour.
#[post("")]
pub async fn upsert_hourly(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<HourlyInput>,
) -> Result<impl Responder, AppError> {
    if !user.can_access_company(input.company_id) {
        return Err(AppError::Forbidden(
            "Forbidden: Cannot edit other company data".into(),
        ));
    }
    input.validate()?;
    let hour = hour_of(&input)?;

    sqlx::query(UPSERT_SQL)
        .bind(input.company_id)
        .bind(input.operation_type.trim())
        .bind(hour)
        .bind(input.value)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Data saved successfully" })))
}

/// Sets many counter cells at once; either all of them are stored or none.
#[put("/bulk")]
pub async fn bulk_update(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<BulkHourlyInput>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    input.validate()?;
    let updates = input
        .updates
        .iter()
        .map(|u| Ok((u, hour_of(u)?)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let mut tx = pool.begin().await?;
    for (update, hour) in &updates {
        sqlx::query(UPSERT_SQL)
            .bind(update.company_id)
            .bind(update.operation_type.trim())
            .bind(*hour)
            .bind(update.value)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    log::info!("{} bulk-updated {} counters", user.username, updates.len());
    Ok(HttpResponse::Ok().json(json!({ "message": "Data updated successfully" })))
}
