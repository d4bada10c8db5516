//! Catalog management (seller-scoped) and public product lookup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::discount::{discounted_price, window_phase, WindowPhase};
use crate::error::ApiError;
use crate::model::{Product, ProductVariation, Shop, VariationOption};
use crate::routes::sellers::require_seller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/seller/:seller_uuid/shops/:shop_uuid/products",
            get(list_products).post(create_product),
        )
        .route(
            "/api/seller/:seller_uuid/shops/:shop_uuid/products/:product_uuid",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route(
            "/api/seller/:seller_uuid/shops/:shop_uuid/products/:product_uuid/discount",
            post(set_discount).delete(clear_discount),
        )
        .route(
            "/api/seller/:seller_uuid/shops/:shop_uuid/products/:product_uuid/variations",
            post(create_variation),
        )
        .route("/api/products/:product_uuid", get(get_public_product))
}

async fn require_shop(
    db: &PgPool,
    seller_uuid: Uuid,
    shop_uuid: Uuid,
) -> Result<Shop, ApiError> {
    sqlx::query_as("SELECT * FROM shops WHERE shop_uuid = $1 AND seller_uuid = $2")
        .bind(shop_uuid)
        .bind(seller_uuid)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shop not found".to_string()))
}

async fn require_product(
    db: &PgPool,
    shop_uuid: Uuid,
    product_uuid: Uuid,
) -> Result<Product, ApiError> {
    sqlx::query_as("SELECT * FROM products WHERE product_uuid = $1 AND shop_uuid = $2")
        .bind(product_uuid)
        .bind(shop_uuid)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    name: String,
    #[serde(default)]
    description: String,
    #[validate(length(min = 1, message = "Category is required"))]
    category: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    sku: Option<String>,
    #[serde(default)]
    quantity: i32,
    low_stock_alert: Option<i32>,
    weight: Option<Decimal>,
}

async fn create_product(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid)): Path<(Uuid, Uuid)>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;

    if req.price <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Price must be positive".to_string()));
    }
    if req.quantity < 0 {
        return Err(ApiError::BadRequest("Quantity cannot be negative".to_string()));
    }

    let product: Product = sqlx::query_as(
        "INSERT INTO products
            (product_uuid, shop_uuid, name, description, category, price,
             compare_at_price, sku, quantity, low_stock_alert, weight, status,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active', NOW(), NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(shop_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.category)
    .bind(req.price)
    .bind(req.compare_at_price)
    .bind(&req.sku)
    .bind(req.quantity)
    .bind(req.low_stock_alert.unwrap_or(5))
    .bind(req.weight)
    .fetch_one(&s.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Product created successfully",
            "product": product,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<u32>,
    per_page: Option<u32>,
    search: Option<String>,
    category: Option<String>,
    status: Option<String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
struct PaginatedResponse<T> {
    data: Vec<T>,
    total: i64,
    page: u32,
}

async fn list_products(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid)): Path<(Uuid, Uuid)>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<Product>>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;

    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(10).min(100);

    // Sort columns are whitelisted; anything else falls back to recency.
    let sort_by = match p.sort_by.as_deref() {
        Some("price") => "price",
        Some("name") => "name",
        Some("total_sales") => "total_sales",
        _ => "created_at",
    };
    let sort_order = match p.sort_order.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    let query = format!(
        "SELECT * FROM products
          WHERE shop_uuid = $1
            AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%'
                 OR description ILIKE '%' || $2 || '%'
                 OR sku ILIKE '%' || $2 || '%')
            AND ($3::TEXT IS NULL OR category = $3)
            AND ($4::TEXT IS NULL OR status = $4)
          ORDER BY {sort_by} {sort_order}
          LIMIT $5 OFFSET $6"
    );

    let products: Vec<Product> = sqlx::query_as(&query)
        .bind(shop_uuid)
        .bind(&p.search)
        .bind(&p.category)
        .bind(&p.status)
        .bind(i64::from(per_page))
        .bind(i64::from((page - 1) * per_page))
        .fetch_all(&s.db)
        .await?;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products
          WHERE shop_uuid = $1
            AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%'
                 OR description ILIKE '%' || $2 || '%'
                 OR sku ILIKE '%' || $2 || '%')
            AND ($3::TEXT IS NULL OR category = $3)
            AND ($4::TEXT IS NULL OR status = $4)",
    )
    .bind(shop_uuid)
    .bind(&p.search)
    .bind(&p.category)
    .bind(&p.status)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(PaginatedResponse { data: products, total, page }))
}

#[derive(Debug, Serialize)]
struct VariationDetail {
    #[serde(flatten)]
    variation: ProductVariation,
    options: Vec<VariationOption>,
}

#[derive(Debug, Serialize)]
struct ProductDetail {
    #[serde(flatten)]
    product: Product,
    variations: Vec<VariationDetail>,
}

async fn load_detail(db: &PgPool, product: Product) -> Result<ProductDetail, ApiError> {
    let variations: Vec<ProductVariation> =
        sqlx::query_as("SELECT * FROM product_variations WHERE product_uuid = $1")
            .bind(product.product_uuid)
            .fetch_all(db)
            .await?;
    let mut detail = Vec::with_capacity(variations.len());
    for variation in variations {
        let options: Vec<VariationOption> = sqlx::query_as(
            "SELECT * FROM product_variation_options WHERE variation_uuid = $1 ORDER BY value",
        )
        .bind(variation.variation_uuid)
        .fetch_all(db)
        .await?;
        detail.push(VariationDetail { variation, options });
    }
    Ok(ProductDetail { product, variations: detail })
}

async fn get_product(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<ProductDetail>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    let product = require_product(&s.db, shop_uuid, product_uuid).await?;
    Ok(Json(load_detail(&s.db, product).await?))
}

async fn get_public_product(
    State(s): State<AppState>,
    Path(product_uuid): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError> {
    let product: Product = sqlx::query_as(
        "UPDATE products SET view_count = view_count + 1
          WHERE product_uuid = $1 AND status = 'active'
          RETURNING *",
    )
    .bind(product_uuid)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;
    Ok(Json(load_detail(&s.db, product).await?))
}

#[derive(Debug, Deserialize)]
struct UpdateProductRequest {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    price: Option<Decimal>,
    compare_at_price: Option<Decimal>,
    sku: Option<String>,
    quantity: Option<i32>,
    low_stock_alert: Option<i32>,
    weight: Option<Decimal>,
    status: Option<String>,
}

async fn update_product(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    require_product(&s.db, shop_uuid, product_uuid).await?;

    if matches!(req.price, Some(p) if p <= Decimal::ZERO) {
        return Err(ApiError::BadRequest("Price must be positive".to_string()));
    }
    if matches!(req.quantity, Some(q) if q < 0) {
        return Err(ApiError::BadRequest("Quantity cannot be negative".to_string()));
    }

    let product: Product = sqlx::query_as(
        "UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price = COALESCE($5, price),
                compare_at_price = COALESCE($6, compare_at_price),
                sku = COALESCE($7, sku),
                quantity = COALESCE($8, quantity),
                low_stock_alert = COALESCE($9, low_stock_alert),
                weight = COALESCE($10, weight),
                status = COALESCE($11, status),
                updated_at = NOW()
          WHERE product_uuid = $1
          RETURNING *",
    )
    .bind(product_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.category)
    .bind(req.price)
    .bind(req.compare_at_price)
    .bind(&req.sku)
    .bind(req.quantity)
    .bind(req.low_stock_alert)
    .bind(req.weight)
    .bind(&req.status)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Product updated successfully",
        "product": product,
    })))
}

/// Soft delete; order history keeps referencing the row.
async fn delete_product(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    require_product(&s.db, shop_uuid, product_uuid).await?;

    sqlx::query("UPDATE products SET status = 'deleted', updated_at = NOW() WHERE product_uuid = $1")
        .bind(product_uuid)
        .execute(&s.db)
        .await?;

    Ok(Json(serde_json::json!({"status": "success", "message": "Product deleted successfully"})))
}

#[derive(Debug, Deserialize, Validate)]
struct DiscountRequest {
    #[validate(length(min = 1, message = "Discount name is required"))]
    name: String,
    #[validate(range(min = 1, max = 90))]
    percentage: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

async fn set_discount(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<DiscountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    let product = require_product(&s.db, shop_uuid, product_uuid).await?;

    if req.end_date <= req.start_date {
        return Err(ApiError::BadRequest("Discount end date must be after start date".to_string()));
    }
    let now = Utc::now();
    if req.end_date <= now {
        return Err(ApiError::BadRequest("Discount window has already ended".to_string()));
    }

    sqlx::query(
        "UPDATE products
            SET discount_name = $2, discount_percentage = $3,
                discount_start_date = $4, discount_end_date = $5, updated_at = NOW()
          WHERE product_uuid = $1",
    )
    .bind(product_uuid)
    .bind(&req.name)
    .bind(req.percentage)
    .bind(req.start_date)
    .bind(req.end_date)
    .execute(&s.db)
    .await?;

    // A window that is already open takes effect now; variation and option
    // prices follow on the next scheduler sweep.
    if window_phase(now, req.start_date, req.end_date) == WindowPhase::Active {
        let list_price = product.compare_at_price.unwrap_or(product.price);
        let new_price = discounted_price(list_price, req.percentage);
        sqlx::query(
            "UPDATE products SET compare_at_price = $2, price = $3, updated_at = NOW()
              WHERE product_uuid = $1",
        )
        .bind(product_uuid)
        .bind(list_price)
        .bind(new_price)
        .execute(&s.db)
        .await?;
    }

    s.scheduler.ensure_running(&s.db);

    let product = require_product(&s.db, shop_uuid, product_uuid).await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Discount scheduled",
        "product": product,
    })))
}

async fn clear_discount(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    require_product(&s.db, shop_uuid, product_uuid).await?;

    sqlx::query(
        "UPDATE product_variation_options o
            SET price = o.compare_at_price
           FROM product_variations v
          WHERE o.variation_uuid = v.variation_uuid
            AND v.product_uuid = $1
            AND o.compare_at_price IS NOT NULL",
    )
    .bind(product_uuid)
    .execute(&s.db)
    .await?;
    sqlx::query(
        "UPDATE product_variations
            SET price = compare_at_price
          WHERE product_uuid = $1 AND compare_at_price IS NOT NULL",
    )
    .bind(product_uuid)
    .execute(&s.db)
    .await?;
    let product: Product = sqlx::query_as(
        "UPDATE products
            SET price = COALESCE(compare_at_price, price),
                discount_name = NULL, discount_percentage = NULL,
                discount_start_date = NULL, discount_end_date = NULL,
                updated_at = NOW()
          WHERE product_uuid = $1
          RETURNING *",
    )
    .bind(product_uuid)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Discount removed",
        "product": product,
    })))
}

#[derive(Debug, Deserialize, Serialize)]
struct VariationOptionInput {
    value: String,
    price: Option<Decimal>,
    compare_at_price: Option<Decimal>,
    stock: i32,
    low_stock_alert: Option<i32>,
    sku: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateVariationRequest {
    #[validate(length(min = 1, message = "Variation name is required"))]
    name: String,
    price: Option<Decimal>,
    compare_at_price: Option<Decimal>,
    #[validate(length(min = 1, message = "At least one option is required"))]
    options: Vec<VariationOptionInput>,
}

/// Adds a variation axis with its options. Stock authority moves to the
/// options; the variation and product quantities become rollups.
async fn create_variation(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, shop_uuid, product_uuid)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<CreateVariationRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;
    require_shop(&s.db, seller_uuid, shop_uuid).await?;
    require_product(&s.db, shop_uuid, product_uuid).await?;

    if req.options.iter().any(|o| o.stock < 0) {
        return Err(ApiError::BadRequest("Option stock cannot be negative".to_string()));
    }

    let mut tx = s.db.begin().await?;

    let rollup: i32 = req.options.iter().map(|o| o.stock).sum();
    let variation: ProductVariation = sqlx::query_as(
        "INSERT INTO product_variations
            (variation_uuid, product_uuid, name, price, compare_at_price, quantity)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(product_uuid)
    .bind(&req.name)
    .bind(req.price)
    .bind(req.compare_at_price)
    .bind(rollup)
    .fetch_one(&mut *tx)
    .await?;

    let mut options = Vec::with_capacity(req.options.len());
    for input in &req.options {
        let option: VariationOption = sqlx::query_as(
            "INSERT INTO product_variation_options
                (option_uuid, variation_uuid, value, price, compare_at_price,
                 stock, low_stock_alert, sku)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(variation.variation_uuid)
        .bind(&input.value)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.low_stock_alert.unwrap_or(5))
        .bind(&input.sku)
        .fetch_one(&mut *tx)
        .await?;
        options.push(option);
    }

    sqlx::query(
        "UPDATE products
            SET quantity = (SELECT COALESCE(SUM(o.stock), 0)::INT
                              FROM product_variation_options o
                              JOIN product_variations v ON v.variation_uuid = o.variation_uuid
                             WHERE v.product_uuid = $1),
                updated_at = NOW()
          WHERE product_uuid = $1",
    )
    .bind(product_uuid)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "variation": VariationDetail { variation, options },
        })),
    ))
}
