//! Seller registration and shop management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{Seller, Shop};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/seller", post(register_seller))
        .route("/api/seller/:seller_uuid", get(get_seller))
        .route("/api/seller/:seller_uuid/shops", get(list_shops).post(create_shop))
}

/// Loads the seller row and verifies it belongs to the caller. Shared by
/// every seller-scoped route.
pub async fn require_seller(db: &PgPool, seller_uuid: Uuid, user_uuid: Uuid) -> Result<Seller, ApiError> {
    let seller: Seller = sqlx::query_as("SELECT * FROM sellers WHERE seller_uuid = $1")
        .bind(seller_uuid)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Seller not found".to_string()))?;
    if seller.user_uuid != user_uuid {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(seller)
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterSellerRequest {
    #[validate(length(min = 1, message = "Owner name is required"))]
    business_owner: String,
    #[validate(email(message = "A valid business email is required"))]
    business_email: String,
    business_phone: Option<String>,
    business_type: Option<String>,
}

async fn register_seller(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<RegisterSellerRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate()?;

    let existing: Option<Seller> = sqlx::query_as(
        "SELECT * FROM sellers
          WHERE LOWER(business_owner) = LOWER($1) OR business_email = $2",
    )
    .bind(&req.business_owner)
    .bind(&req.business_email)
    .fetch_optional(&s.db)
    .await?;
    if let Some(existing) = existing {
        let message = if existing.business_email == req.business_email {
            "This email is already registered with another seller"
        } else {
            "A seller with this owner name already exists"
        };
        return Err(ApiError::Conflict(message.to_string()));
    }

    let seller: Seller = sqlx::query_as(
        "INSERT INTO sellers
            (seller_uuid, user_uuid, business_owner, business_email,
             business_phone, business_type, status, date_registered)
         VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user)
    .bind(&req.business_owner)
    .bind(&req.business_email)
    .bind(&req.business_phone)
    .bind(&req.business_type)
    .fetch_one(&s.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Seller registration submitted successfully",
            "seller": seller,
        })),
    ))
}

async fn get_seller(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let seller = require_seller(&s.db, seller_uuid, user).await?;

    // Sales figures are derived from completed orders rather than cached on
    // the seller row.
    let (units_sold, gross_revenue): (i64, Decimal) = sqlx::query_as(
        "SELECT COALESCE(SUM(oi.quantity), 0)::BIGINT,
                COALESCE(SUM(oi.subtotal), 0)::NUMERIC
           FROM order_items oi
           JOIN orders o ON o.order_uuid = oi.order_uuid
           JOIN products p ON p.product_uuid = oi.product_uuid
           JOIN shops sh ON sh.shop_uuid = p.shop_uuid
          WHERE sh.seller_uuid = $1 AND o.status = 'completed'",
    )
    .bind(seller_uuid)
    .fetch_one(&s.db)
    .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "seller": seller,
        "units_sold": units_sold,
        "gross_revenue": gross_revenue,
    })))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateShopRequest {
    #[validate(length(min = 1, message = "Shop name is required"))]
    name: String,
    description: Option<String>,
}

async fn create_shop(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
    Json(req): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<Shop>), ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;

    let shop: Shop = sqlx::query_as(
        "INSERT INTO shops (shop_uuid, seller_uuid, name, description, archived, created_at)
         VALUES ($1, $2, $3, $4, FALSE, NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(seller_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .fetch_one(&s.db)
    .await?;

    Ok((StatusCode::CREATED, Json(shop)))
}

async fn list_shops(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
) -> Result<Json<Vec<Shop>>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    let shops: Vec<Shop> = sqlx::query_as(
        "SELECT * FROM shops WHERE seller_uuid = $1 AND archived = FALSE ORDER BY created_at",
    )
    .bind(seller_uuid)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(shops))
}
