use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{
        task::{expire_overdue, TaskPhotoInput, TaskStatusInput},
        user::Role,
        Task, TaskInput, TaskStatus,
    },
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

const TASK_SELECT: &str = "SELECT t.id, t.title, t.assigned_company_id, t.assigned_by_user_id,
            t.created_at, t.duration_minutes, t.status, t.photo_url, t.require_photo,
            c.name AS company_name, u.username AS assigned_by_username
     FROM tasks t
     JOIN companies c ON t.assigned_company_id = c.id
     JOIN users u ON t.assigned_by_user_id = u.id";

/// Company a task is assigned to, or 404.
async fn task_company(pool: &PgPool, task_id: i32) -> Result<i32, AppError> {
    sqlx::query_scalar("SELECT assigned_company_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

/// Retrieves the task board, newest first.
///
/// Managers only see the tasks of their company. Pending tasks whose time
/// ran out are switched to `expired` before the list is returned.
///
/// ## Responses:
/// - `200 OK`: A JSON array of `Task` objects.
/// - `401 Unauthorized`: Missing or invalid token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let company_filter = if user.is_manager() {
        Some(user.company_id.unwrap_or(-1))
    } else {
        None
    };

    let mut tasks = sqlx::query_as::<_, Task>(&format!(
        "{} WHERE ($1::INT IS NULL OR t.assigned_company_id = $1) ORDER BY t.created_at DESC",
        TASK_SELECT
    ))
    .bind(company_filter)
    .fetch_all(&**pool)
    .await?;

    let expired = expire_overdue(&mut tasks, Utc::now());
    if !expired.is_empty() {
        sqlx::query("UPDATE tasks SET status = $1 WHERE id = ANY($2) AND status = $3")
            .bind(TaskStatus::Expired)
            .bind(&expired)
            .bind(TaskStatus::Pending)
            .execute(&**pool)
            .await?;
        log::debug!("expired tasks {:?}", expired);
    }

    Ok(HttpResponse::Ok().json(tasks))
}

/// Assigns a new task to a company.
///
/// ## Responses:
/// - `201 Created`: The new `Task`, `pending`.
/// - `403 Forbidden`: Caller is a manager.
/// - `422 Unprocessable Entity`: Title, company or duration missing or out of range.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    if !matches!(user.role, Role::Admin | Role::Operator) {
        return Err(AppError::Forbidden(
            "Only admin and operator can create tasks".into(),
        ));
    }
    task_data.validate()?;

    let id: i32 = sqlx::query_scalar(
        "INSERT INTO tasks (title, assigned_company_id, assigned_by_user_id, created_at,
                            duration_minutes, status, require_photo)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(task_data.title.trim())
    .bind(task_data.assigned_company_id)
    .bind(user.id)
    .bind(Utc::now())
    .bind(task_data.duration_minutes)
    .bind(TaskStatus::Pending)
    .bind(task_data.require_photo)
    .fetch_one(&**pool)
    .await?;

    let task = sqlx::query_as::<_, Task>(&format!("{} WHERE t.id = $1", TASK_SELECT))
        .bind(id)
        .fetch_one(&**pool)
        .await?;

    log::info!(
        "{} assigned task {} to company {}",
        user.username,
        id,
        task_data.assigned_company_id
    );
    Ok(HttpResponse::Created().json(task))
}

#[patch("/{id}/status")]
pub async fn update_task_status(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    input: web::Json<TaskStatusInput>,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();
    let company_id = task_company(&pool, task_id).await?;
    user.require_company(company_id)?;

    sqlx::query("UPDATE tasks SET status = $1 WHERE id = $2")
        .bind(input.status)
        .bind(task_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task status updated" })))
}

/// Attaches the proof photo previously stored through `/api/upload`.
#[patch("/{id}/photo")]
pub async fn update_task_photo(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
    input: web::Json<TaskPhotoInput>,
) -> Result<impl Responder, AppError> {
    input.validate()?;
    let task_id = task_id.into_inner();
    let company_id = task_company(&pool, task_id).await?;
    user.require_company(company_id)?;

    sqlx::query("UPDATE tasks SET photo_url = $1 WHERE id = $2")
        .bind(&input.photo_url)
        .bind(task_id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Task photo updated" })))
}

#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden("Only admin can delete tasks".into()));
    }
    let task_id = task_id.into_inner();

    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&**pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    log::info!("{} deleted task {}", user.username, task_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}
