use crate::{
    auth::AuthenticatedUser,
    config::Config,
    error::AppError,
    uploads::{
        content_type_for, has_task_photo_extension, resolve, task_photo_extension,
        task_photo_name, MAX_TASK_PHOTO_BYTES,
    },
};
use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse, Responder};
use futures::StreamExt;
use serde_json::json;

/// A file sent as one field of a `multipart/form-data` body.
pub(crate) struct FilePart {
    /// Lowercased media type without parameters; empty when the client sent
    /// none.
    pub media_type: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Reads the file field `name` of a form. Other fields are skipped. A file
/// over `limit` bytes is refused with `too_large`.
pub(crate) async fn read_file_field(
    mut form: Multipart,
    name: &str,
    limit: usize,
    too_large: &str,
) -> Result<Option<FilePart>, AppError> {
    while let Some(field) = form.next().await {
        let mut field = field?;
        if field.content_disposition().get_name() != Some(name) {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let media_type = field
            .content_type()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_default();
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::BadRequest(too_large.to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Some(FilePart {
            media_type,
            file_name,
            bytes,
        }));
    }
    Ok(None)
}

/// Stores a task proof photo sent as the `photo` field of a form.
///
/// ## Responses:
/// - `200 OK`: `{photo_url}` pointing below `/uploads`.
/// - `400 Bad Request`: No file, more than 10 MB, or not a JPEG, PNG or GIF
///   by both content type and file name.
#[post("")]
pub async fn upload_photo(
    config: web::Data<Config>,
    user: AuthenticatedUser,
    form: Multipart,
) -> Result<impl Responder, AppError> {
    let file = read_file_field(form, "photo", MAX_TASK_PHOTO_BYTES, "File too large")
        .await?
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;

    let named_as_image = file
        .file_name
        .as_deref()
        .map_or(false, has_task_photo_extension);
    let extension = task_photo_extension(&file.media_type)
        .filter(|_| named_as_image)
        .ok_or_else(|| AppError::BadRequest("Only image files are allowed".into()))?;

    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    let file_name = task_photo_name(extension);
    tokio::fs::write(config.uploads_dir.join(&file_name), &file.bytes).await?;

    log::info!(
        "{} uploaded {} ({} bytes)",
        user.username,
        file_name,
        file.bytes.len()
    );
    Ok(HttpResponse::Ok().json(json!({ "photo_url": format!("/uploads/{}", file_name) })))
}

/// Serves stored uploads. Nothing outside the uploads directory is reachable.
#[get("/uploads/{path:.*}")]
pub async fn serve_upload(
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let not_found = || AppError::NotFound("File not found".into());
    let file = resolve(&config.uploads_dir, &path).ok_or_else(not_found)?;

    match tokio::fs::read(&file).await {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type(content_type_for(&file))
            .body(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found()),
        // Directories and the like.
        Err(e) if e.kind() == std::io::ErrorKind::IsADirectory => Err(not_found()),
        Err(e) => Err(e.into()),
    }
}
