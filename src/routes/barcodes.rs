use crate::{
    auth::AuthenticatedUser,
    barcode::render_svg,
    error::AppError,
    models::{
        product::{BarcodeSearchQuery, GenerateRequest, RenderRequest},
        Product,
    },
};
use actix_web::{get, http::header, post, web, HttpResponse, Responder};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use sqlx::PgPool;

const MIN_SCALE: f64 = 0.5;
const MAX_SCALE: f64 = 4.0;
/// Narrowest bar at scale 1.
const BASE_MODULE: f64 = 2.0;

/// Group code of a barcode, or the code itself when it is not a barcode.
async fn resolve_group(pool: &PgPool, code: &str) -> Result<String, AppError> {
    let group: Option<String> =
        sqlx::query_scalar("SELECT group_code FROM products WHERE barcode = $1")
            .bind(code)
            .fetch_optional(pool)
            .await?;
    Ok(group.unwrap_or_else(|| code.to_string()))
}

/// The pack of `quantity` within the group of `base_code`, or 404.
async fn find_pack(pool: &PgPool, base_code: &str, quantity: i32) -> Result<Product, AppError> {
    let group = resolve_group(pool, base_code).await?;
    sqlx::query_as::<_, Product>(
        "SELECT id, group_code, product_name, barcode, quantity FROM products
         WHERE group_code = $1 AND quantity = $2
         ORDER BY id LIMIT 1",
    )
    .bind(&group)
    .bind(quantity)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "Barcode with quantity {} not found for group {}",
            quantity, group
        ))
    })
}

fn missing_inputs() -> AppError {
    AppError::BadRequest("Missing base_code or quantity".into())
}

/// Every pack of the product a barcode or group code belongs to, smallest
/// first.
#[get("/search")]
pub async fn search_barcode(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query: web::Query<BarcodeSearchQuery>,
) -> Result<impl Responder, AppError> {
    let needle = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("query is required".into()))?;

    let by_barcode: Option<String> =
        sqlx::query_scalar("SELECT group_code FROM products WHERE barcode = $1")
            .bind(needle)
            .fetch_optional(&**pool)
            .await?;
    let (search_type, group) = match by_barcode {
        Some(group) => ("barcode", group),
        None => ("group_code", needle.to_string()),
    };

    let products = sqlx::query_as::<_, Product>(
        "SELECT id, group_code, product_name, barcode, quantity FROM products
         WHERE group_code = $1
         ORDER BY quantity, id",
    )
    .bind(&group)
    .fetch_all(&**pool)
    .await?;
    if products.is_empty() {
        return Err(AppError::NotFound("Barcode or group code not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "found": true,
        "search_type": search_type,
        "group_code": group,
        "products": products,
    })))
}

/// Barcode of one pack, with a Code 128 rendering as an SVG data URL.
///
/// ## Responses:
/// - `200 OK`: `{success, barcode_string, product_name, image}`.
/// - `400 Bad Request`: `base_code` or `quantity` missing.
/// - `404 Not Found`: No pack of that quantity in the group.
#[post("/generate")]
pub async fn generate_barcode(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    input: web::Json<GenerateRequest>,
) -> Result<impl Responder, AppError> {
    let (base_code, quantity) = input.parts().ok_or_else(missing_inputs)?;
    let product = find_pack(&pool, &base_code, quantity).await?;

    let svg = render_svg(&product.barcode, BASE_MODULE)?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "barcode_string": product.barcode,
        "product_name": product.product_name,
        "image": format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)),
    })))
}

/// The pack's barcode as a downloadable SVG file.
#[post("/render")]
pub async fn render_barcode(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    input: web::Json<RenderRequest>,
) -> Result<impl Responder, AppError> {
    let request = GenerateRequest {
        base_code: input.base_code.clone(),
        quantity: input.quantity,
    };
    let (base_code, quantity) = request.parts().ok_or_else(missing_inputs)?;
    let product = find_pack(&pool, &base_code, quantity).await?;

    let scale = input
        .scale
        .filter(|s| s.is_finite())
        .unwrap_or(1.0)
        .clamp(MIN_SCALE, MAX_SCALE);
    let svg = render_svg(&product.barcode, BASE_MODULE * scale)?;

    Ok(HttpResponse::Ok()
        .content_type("image/svg+xml")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"barcode_{}.svg\"", product.barcode),
        ))
        .body(svg))
}
