use crate::{
    auth::{verify_password, AuthenticatedUser, JwtKeys, LoginRequest, LoginResponse},
    error::AppError,
    models::user::UserCredentials,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

/// Login user
///
/// Checks the password against the stored bcrypt hash and returns a bearer
/// token together with the account.
///
/// ## Responses:
/// - `200 OK`: `{token, user}`.
/// - `401 Unauthorized`: Unknown user or wrong password.
/// - `422 Unprocessable Entity`: Empty username or password.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    keys: web::Data<JwtKeys>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, username, password_hash, role, company_id FROM users WHERE username = $1",
    )
    .bind(login_data.username.trim())
    .fetch_optional(&**pool)
    .await?;

    let user = match user {
        Some(user) if verify_password(&login_data.password, &user.password_hash)? => user,
        _ => {
            log::warn!("failed login for {:?}", login_data.username);
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    let token = keys.generate_token(user.id, &user.username, user.role, user.company_id)?;
    log::info!("user {} logged in as {}", user.username, user.role);

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: AuthenticatedUser {
            id: user.id,
            username: user.username,
            role: user.role,
            company_id: user.company_id,
        },
    }))
}

/// Logout user
///
/// Tokens are stateless; the client drops its copy.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Logged out successfully" }))
}

/// Returns the account the bearer token belongs to.
#[get("/me")]
pub async fn me(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(json!({ "user": user }))
}
