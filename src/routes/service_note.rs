use crate::{
    auth::AuthenticatedUser,
    config::Config,
    docx,
    error::AppError,
    service_note::{file_name, paragraphs, ServiceNoteRequest},
};
use actix_web::{http::header, post, web, HttpResponse, Responder};
use validator::Validate;

/// Renders a service note as a Word document.
///
/// ## Responses:
/// - `200 OK`: The `.docx` file as an attachment.
/// - `422 Unprocessable Entity`: A required field is missing.
#[post("/generate")]
pub async fn generate(
    config: web::Data<Config>,
    user: AuthenticatedUser,
    input: web::Json<ServiceNoteRequest>,
) -> Result<impl Responder, AppError> {
    input.validate()?;

    let document = docx::build(&paragraphs(&input, &config.service_note))?;
    let encoded = urlencoding::encode(&file_name(&input)).into_owned();

    log::info!(
        "{} generated a service note for {}",
        user.username,
        input.employee.trim()
    );
    Ok(HttpResponse::Ok()
        .content_type(docx::CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                encoded, encoded
            ),
        ))
        .body(document))
}
