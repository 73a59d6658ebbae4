use crate::{
    auth::AuthenticatedUser,
    encoding::decode_text,
    error::AppError,
    models::{
        product::{parse_import, ProductSearchQuery, ProductSearchResult},
        user::Role,
    },
};
use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;

/// Looks a code up as a barcode first, then as a group code with a name.
#[get("/search")]
pub async fn search_product(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query: web::Query<ProductSearchQuery>,
) -> Result<impl Responder, AppError> {
    let code = query
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Код не указан".into()))?;

    let by_barcode: Option<(String, Option<String>)> =
        sqlx::query_as("SELECT group_code, product_name FROM products WHERE barcode = $1 LIMIT 1")
            .bind(code)
            .fetch_optional(&**pool)
            .await?;
    if let Some((group_code, product_name)) = by_barcode {
        return Ok(HttpResponse::Ok().json(ProductSearchResult {
            found: true,
            search_type: Some("barcode"),
            group_code: Some(group_code),
            product_name,
        }));
    }

    let by_group: Option<(String, String)> = sqlx::query_as(
        "SELECT group_code, product_name FROM products
         WHERE group_code = $1 AND product_name IS NOT NULL AND product_name <> ''
         LIMIT 1",
    )
    .bind(code)
    .fetch_optional(&**pool)
    .await?;

    let result = match by_group {
        Some((group_code, product_name)) => ProductSearchResult {
            found: true,
            search_type: Some("group_code"),
            group_code: Some(group_code),
            product_name: Some(product_name),
        },
        None => ProductSearchResult::not_found(),
    };
    Ok(HttpResponse::Ok().json(result))
}

/// Loads the product catalogue from a `group_code;product_name;barcode;quantity`
/// text body. Rows are upserted on barcode.
///
/// ## Responses:
/// - `200 OK`: `{imported, skipped}`.
/// - `400 Bad Request`: Empty body.
/// - `403 Forbidden`: Caller is not an admin.
#[post("/import")]
pub async fn import_products(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin])?;
    if body.is_empty() {
        return Err(AppError::BadRequest("Empty import file".into()));
    }
    let (rows, skipped) = parse_import(&decode_text(&body));

    let mut tx = pool.begin().await?;
    for row in &rows {
        sqlx::query(
            "INSERT INTO products (group_code, product_name, barcode, quantity)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (barcode) DO UPDATE SET
                 group_code = EXCLUDED.group_code,
                 product_name = EXCLUDED.product_name,
                 quantity = EXCLUDED.quantity",
        )
        .bind(&row.group_code)
        .bind(&row.product_name)
        .bind(&row.barcode)
        .bind(row.quantity)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    log::info!(
        "{} imported {} products, skipped {}",
        user.username,
        rows.len(),
        skipped
    );
    Ok(HttpResponse::Ok().json(json!({ "imported": rows.len(), "skipped": skipped })))
}
