use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::user::Role,
    roster::{photo_extension, RosterBody, RosterStore, MAX_PHOTO_BYTES},
    routes::uploads::read_file_field,
};
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse, Responder};
use serde_json::json;

/// The badge roster with photo URLs.
#[get("")]
pub async fn get_roster(
    roster: web::Data<RosterStore>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let rows = roster.load_with_photos().await?;
    Ok(HttpResponse::Ok().json(RosterBody { rows }))
}

/// Replaces the roster with the edited rows.
#[put("")]
pub async fn save_roster(
    roster: web::Data<RosterStore>,
    user: AuthenticatedUser,
    body: web::Json<RosterBody>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    let saved = roster.save(body.into_inner().rows).await?;

    log::info!("{} saved roster ({} rows)", user.username, saved);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "rows": saved })))
}

/// Largest roster file accepted.
const MAX_ROSTER_BYTES: usize = 5 * 1024 * 1024;

/// Replaces the roster with a CSV file, sent as the `file` field of a form,
/// in UTF-8 or Windows-1251.
#[post("/upload")]
pub async fn upload_roster(
    roster: web::Data<RosterStore>,
    user: AuthenticatedUser,
    form: Multipart,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::Operator])?;
    let file = read_file_field(form, "file", MAX_ROSTER_BYTES, "Файл слишком большой")
        .await?
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("Файл не передан".into()))?;
    let imported = roster.import(&file.bytes).await?;

    log::info!("{} uploaded roster ({} rows)", user.username, imported);
    Ok(HttpResponse::Ok().json(json!({ "success": true, "rows": imported })))
}

/// Stores the badge photo of an employee, sent as the `file` field of a form.
///
/// ## Responses:
/// - `200 OK`: `{success, photo_url}`.
/// - `400 Bad Request`: No file, more than 5 MB, unsupported image type or
///   a code with no usable characters.
/// - `403 Forbidden`: Caller is not an admin.
#[post("/photo/{code}")]
pub async fn upload_photo(
    roster: web::Data<RosterStore>,
    user: AuthenticatedUser,
    code: web::Path<String>,
    form: Multipart,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    let file = read_file_field(form, "file", MAX_PHOTO_BYTES, "Файл больше 5 МБ")
        .await?
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("Файл не передан".into()))?;
    let extension = photo_extension(&file.media_type)
        .ok_or_else(|| AppError::BadRequest("Допустимы только изображения".into()))?;

    let url = roster.save_photo(&code, extension, &file.bytes).await?;

    log::info!("{} set photo of {}", user.username, code.as_str());
    Ok(HttpResponse::Ok().json(json!({ "success": true, "photo_url": url })))
}
