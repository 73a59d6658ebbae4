use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        tsd::{
            device_check_body, ensure_below_limit, ensure_device_free, export_csv,
            BulkCompanyRequest, BulkError, CompanyStats, HistoryQuery, IssueRequest,
            ReturnRequest, StatsQuery, BRIGADIER_LOGIN,
        },
        user::Role,
        TsdTransaction,
    },
    roster::RosterStore,
};
use actix_web::{delete, get, http::header, post, web, HttpResponse, Responder};
use chrono::Local;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use validator::Validate;

const NO_ACTIVE_ISSUE: &str = "Активная выдача не найдена для этого ТСД";

const TSD_COLUMNS: &str = "id, issue_time, employee_login, employee_name, company, tsd_number, \
                           return_time, status, operator_id";

/// Shared filter of the history and export queries; every parameter may be NULL.
const HISTORY_FILTER: &str = "WHERE ($1::DATE IS NULL OR issue_time::DATE >= $1)
       AND ($2::DATE IS NULL OR issue_time::DATE <= $2)
       AND ($3::tsd_status IS NULL OR status = $3)
       AND ($4::TEXT IS NULL OR employee_login LIKE $4)
       AND ($5::TEXT IS NULL OR tsd_number LIKE $5)";

/// The open issue of a device, if it is out.
async fn active_issue(
    conn: &mut PgConnection,
    tsd_number: &str,
    company: Option<&str>,
) -> Result<Option<TsdTransaction>, AppError> {
    let found = sqlx::query_as::<_, TsdTransaction>(&format!(
        "SELECT {} FROM tsd_transactions
         WHERE tsd_number = $1 AND status = 'issued' AND ($2::TEXT IS NULL OR company = $2)
         ORDER BY issue_time DESC LIMIT 1",
        TSD_COLUMNS
    ))
    .bind(tsd_number)
    .bind(company)
    .fetch_optional(conn)
    .await?;
    Ok(found)
}

async fn insert_issue(
    conn: &mut PgConnection,
    employee_login: &str,
    employee_name: Option<&str>,
    company: Option<&str>,
    tsd_number: &str,
    operator_id: i32,
) -> Result<TsdTransaction, AppError> {
    sqlx::query_as::<_, TsdTransaction>(&format!(
        "INSERT INTO tsd_transactions (employee_login, employee_name, company, tsd_number, status, operator_id)
         VALUES ($1, $2, $3, $4, 'issued', $5)
         RETURNING {}",
        TSD_COLUMNS
    ))
    .bind(employee_login)
    .bind(employee_name)
    .bind(company)
    .bind(tsd_number)
    .bind(operator_id)
    .fetch_one(conn)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("ТСД уже выдан".into()),
        other => other,
    })
}

/// Closes an open issue. A row already returned by a concurrent request
/// counts as not found.
async fn close_issue(conn: &mut PgConnection, id: i32) -> Result<TsdTransaction, AppError> {
    sqlx::query_as::<_, TsdTransaction>(&format!(
        "UPDATE tsd_transactions SET return_time = NOW(), status = 'returned'
         WHERE id = $1 AND status = 'issued'
         RETURNING {}",
        TSD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(NO_ACTIVE_ISSUE.into()))
}

fn error_text(err: &AppError) -> String {
    match err {
        AppError::Rejected { message, .. }
        | AppError::Conflict(message)
        | AppError::NotFound(message)
        | AppError::BadRequest(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Classifies a scanned barcode as an employee badge or a terminal.
///
/// The roster is consulted first; anything not on it is treated as a device
/// number and reported as issued or available.
#[get("/check/{barcode}")]
pub async fn check_barcode(
    pool: web::Data<PgPool>,
    roster: web::Data<RosterStore>,
    _user: AuthenticatedUser,
    barcode: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let barcode = barcode.into_inner();

    match roster.find_by_code(&barcode).await {
        Ok(Some(row)) => {
            let name = if row.name.is_empty() { row.code.clone() } else { row.name };
            let company = Some(row.company).filter(|c| !c.is_empty());
            return Ok(HttpResponse::Ok().json(json!({
                "type": "employee",
                "login": row.code,
                "name": name,
                "company": company,
            })));
        }
        Ok(None) => {}
        Err(e) => log::warn!("roster lookup failed: {}", e),
    }

    let mut conn = pool.acquire().await?;
    let active = active_issue(&mut conn, &barcode, None).await?;
    Ok(HttpResponse::Ok().json(device_check_body(&barcode, active.as_ref())))
}

/// Hands a terminal to an employee.
///
/// ## Responses:
/// - `200 OK`: `{success, transaction}`.
/// - `400 Bad Request`: The device is already out or the employee holds the
///   maximum number of devices; `details` describes the conflict.
/// - `409 Conflict`: A concurrent issue of the same device won.
/// - `422 Unprocessable Entity`: Login or device number missing.
#[post("/issue")]
pub async fn issue(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<IssueRequest>,
) -> Result<impl Responder, AppError> {
    let input = input.into_inner().trimmed();
    input.validate()?;

    let mut tx = pool.begin().await?;
    // Serializes issues per employee so the device limit cannot be raced.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(&input.employee_login)
        .execute(&mut *tx)
        .await?;

    let active = active_issue(&mut tx, &input.tsd_number, None).await?;
    ensure_device_free(active.as_ref())?;

    let held: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tsd_transactions WHERE employee_login = $1 AND status = 'issued'",
    )
    .bind(&input.employee_login)
    .fetch_one(&mut *tx)
    .await?;
    ensure_below_limit(&input.employee_login, held)?;

    let transaction = insert_issue(
        &mut tx,
        &input.employee_login,
        input.employee_name.as_deref(),
        input.company.as_deref(),
        &input.tsd_number,
        user.id,
    )
    .await?;
    tx.commit().await?;

    log::info!(
        "{} issued {} to {}",
        user.username,
        transaction.tsd_number,
        transaction.employee_login
    );
    Ok(HttpResponse::Ok().json(json!({ "success": true, "transaction": transaction })))
}

/// Hands several terminals to a company foreman. Numbers that cannot be
/// issued are reported individually.
#[post("/issue-bulk-company")]
pub async fn issue_bulk_company(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<BulkCompanyRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let company = input.company.trim();

    let mut conn = pool.acquire().await?;
    let mut issued = Vec::new();
    let mut errors = Vec::new();
    for number in input.numbers() {
        let outcome = match active_issue(&mut conn, &number, None).await {
            Ok(active) => match ensure_device_free(active.as_ref()) {
                Ok(()) => {
                    insert_issue(&mut conn, BRIGADIER_LOGIN, None, Some(company), &number, user.id)
                        .await
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        match outcome {
            Ok(transaction) => issued.push(transaction),
            Err(e) => errors.push(BulkError {
                tsd_number: number,
                error: error_text(&e),
            }),
        }
    }

    log::info!(
        "{} issued {} devices to {} ({} failed)",
        user.username,
        issued.len(),
        company,
        errors.len()
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total_issued": issued.len(),
        "total_errors": errors.len(),
        "issued": issued,
        "errors": errors,
    })))
}

#[post("/return")]
pub async fn return_device(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<ReturnRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let number = input.tsd_number.trim();

    let mut conn = pool.acquire().await?;
    let active = active_issue(&mut conn, number, None)
        .await?
        .ok_or_else(|| AppError::NotFound(NO_ACTIVE_ISSUE.into()))?;
    let transaction = close_issue(&mut conn, active.id).await?;

    log::info!("{} took back {}", user.username, transaction.tsd_number);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "transaction": transaction })))
}

/// Takes back several terminals from a company. Only issues held by that
/// company are closed.
#[post("/return-bulk-company")]
pub async fn return_bulk_company(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    input: web::Json<BulkCompanyRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let company = input.company.trim();

    let mut conn = pool.acquire().await?;
    let mut returned = Vec::new();
    let mut errors = Vec::new();
    for number in input.numbers() {
        let outcome = match active_issue(&mut conn, &number, Some(company)).await {
            Ok(Some(active)) => close_issue(&mut conn, active.id).await,
            Ok(None) => Err(AppError::NotFound(NO_ACTIVE_ISSUE.into())),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(transaction) => returned.push(transaction),
            Err(e) => errors.push(BulkError {
                tsd_number: number,
                error: error_text(&e),
            }),
        }
    }

    log::info!(
        "{} took back {} devices from {} ({} failed)",
        user.username,
        returned.len(),
        company,
        errors.len()
    );
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total_returned": returned.len(),
        "total_errors": errors.len(),
        "returned": returned,
        "errors": errors,
    })))
}

/// Devices currently out, newest first.
#[get("/active")]
pub async fn list_active(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let rows = sqlx::query_as::<_, TsdTransaction>(&format!(
        "SELECT {} FROM tsd_transactions WHERE status = 'issued' ORDER BY issue_time DESC",
        TSD_COLUMNS
    ))
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Filtered, paginated issue history.
///
/// ## Query Parameters:
/// - `startDate`, `endDate` (optional): Inclusive range on the issue date.
/// - `status` (optional): `issued` or `returned`.
/// - `employee_login`, `tsd_number` (optional): Substring matches.
/// - `limit` (default 1000, at most 5000), `offset` (default 0).
///
/// ## Responses:
/// - `200 OK`: `{history, total, limit, offset}`.
#[get("/history")]
pub async fn history(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, AppError> {
    let login = HistoryQuery::like(&query.employee_login);
    let number = HistoryQuery::like(&query.tsd_number);
    let (limit, offset) = (query.limit(), query.offset());

    let rows = sqlx::query_as::<_, TsdTransaction>(&format!(
        "SELECT {} FROM tsd_transactions {} ORDER BY issue_time DESC LIMIT $6 OFFSET $7",
        TSD_COLUMNS, HISTORY_FILTER
    ))
    .bind(query.start_date)
    .bind(query.end_date)
    .bind(query.status)
    .bind(&login)
    .bind(&number)
    .bind(limit)
    .bind(offset)
    .fetch_all(&**pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM tsd_transactions {}",
        HISTORY_FILTER
    ))
    .bind(query.start_date)
    .bind(query.end_date)
    .bind(query.status)
    .bind(&login)
    .bind(&number)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "history": rows,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

#[delete("/{id}")]
pub async fn delete_transaction(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Доступ запрещен. Только администратор может удалять записи.".into(),
        ));
    }
    let id = id.into_inner();

    let result = sqlx::query("DELETE FROM tsd_transactions WHERE id = $1")
        .bind(id)
        .execute(&**pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Запись не найдена".into()));
    }

    log::info!("{} deleted TSD record {}", user.username, id);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Запись удалена" })))
}

/// Per-company device counts. A manager only sees their own company.
#[get("/stats")]
pub async fn stats(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    query: web::Query<StatsQuery>,
) -> Result<impl Responder, AppError> {
    let own_company: Option<String> = match (user.is_manager(), user.company_id) {
        (true, Some(company_id)) => {
            sqlx::query_scalar("SELECT name FROM companies WHERE id = $1")
                .bind(company_id)
                .fetch_optional(&**pool)
                .await?
        }
        _ => None,
    };
    let requested = query
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let rows = sqlx::query_as::<_, CompanyStats>(
        "SELECT company,
                COUNT(*) FILTER (WHERE status = 'issued') AS issued_count,
                COUNT(*) FILTER (WHERE status = 'returned') AS returned_count,
                string_agg(tsd_number, ',' ORDER BY tsd_number) FILTER (WHERE status = 'issued')
                    AS issued_tsd_numbers,
                COUNT(*) FILTER (WHERE status = 'issued' AND employee_login = $3)
                    AS company_issued_count
         FROM tsd_transactions
         WHERE company IS NOT NULL AND company <> ''
           AND ($1::TEXT IS NULL OR company = $1)
           AND ($2::TEXT IS NULL OR company = $2)
         GROUP BY company
         ORDER BY company",
    )
    .bind(requested)
    .bind(own_company)
    .bind(BRIGADIER_LOGIN)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(rows))
}

/// Issue history as a CSV attachment.
#[get("/export")]
pub async fn export(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, AppError> {
    let rows = sqlx::query_as::<_, TsdTransaction>(&format!(
        "SELECT {} FROM tsd_transactions {} ORDER BY issue_time DESC",
        TSD_COLUMNS, HISTORY_FILTER
    ))
    .bind(query.start_date)
    .bind(query.end_date)
    .bind(query.status)
    .bind(HistoryQuery::like(&query.employee_login))
    .bind(HistoryQuery::like(&query.tsd_number))
    .fetch_all(&**pool)
    .await?;

    let file_name = format!("tsd_history_{}.csv", Local::now().format("%Y-%m-%d"));
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(export_csv(&rows)))
}
