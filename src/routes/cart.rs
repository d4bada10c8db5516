//! Buyer cart endpoints.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Jsonb;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::selection::ItemSelection;
use crate::error::ApiError;
use crate::model::{Product, ProductVariation, VariationOption};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/update/:item_uuid", put(update_cart_item))
        .route("/api/cart/remove/:item_uuid", delete(remove_from_cart))
        .route("/api/cart/clear", post(clear_cart))
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    item_uuid: Uuid,
    product_uuid: Uuid,
    variation_uuid: Option<Uuid>,
    quantity: i32,
    selected_option: Option<Jsonb<ItemSelection>>,
    product_name: String,
    product_price: Decimal,
}

#[derive(Debug, Serialize)]
struct CartLineView {
    item_uuid: Uuid,
    product_uuid: Uuid,
    product_name: String,
    variation_uuid: Option<Uuid>,
    selection: ItemSelection,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

#[derive(Debug, Serialize)]
struct CartView {
    items: Vec<CartLineView>,
    total_items: i64,
    total_price: Decimal,
}

async fn fetch_cart_view(db: &PgPool, user_uuid: Uuid) -> Result<CartView, ApiError> {
    let rows: Vec<CartLineRow> = sqlx::query_as(
        "SELECT ci.item_uuid, ci.product_uuid, ci.variation_uuid, ci.quantity,
                ci.selected_option,
                p.name AS product_name, p.price AS product_price
           FROM cart_items ci
           JOIN products p ON p.product_uuid = ci.product_uuid
          WHERE ci.user_uuid = $1
          ORDER BY ci.created_at",
    )
    .bind(user_uuid)
    .fetch_all(db)
    .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total_items = 0i64;
    let mut total_price = Decimal::ZERO;
    for row in rows {
        let selection = match &row.selected_option {
            Some(Jsonb(sel)) => sel.clone(),
            None => ItemSelection::NoVariation,
        };
        let unit_price = selection.price_override().unwrap_or(row.product_price);
        let line_total = unit_price * Decimal::from(row.quantity);
        total_items += i64::from(row.quantity);
        total_price += line_total;
        items.push(CartLineView {
            item_uuid: row.item_uuid,
            product_uuid: row.product_uuid,
            product_name: row.product_name,
            variation_uuid: row.variation_uuid,
            selection,
            quantity: row.quantity,
            unit_price,
            line_total,
        });
    }
    Ok(CartView { items, total_items, total_price })
}

async fn get_cart(State(s): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<CartView>, ApiError> {
    Ok(Json(fetch_cart_view(&s.db, user).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct AddToCartRequest {
    product_uuid: Uuid,
    variation_uuid: Option<Uuid>,
    option_uuid: Option<Uuid>,
    #[validate(range(min = 1))]
    quantity: i32,
}

#[derive(Debug, Serialize)]
struct AddToCartResponse {
    #[serde(flatten)]
    cart: CartView,
    item_uuid: Uuid,
}

/// Validates the referenced product/variation/option, snapshots the selection
/// server-side and merges with an existing line carrying the same selection.
async fn add_to_cart(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<Json<AddToCartResponse>, ApiError> {
    req.validate()?;

    let product: Product = sqlx::query_as("SELECT * FROM products WHERE product_uuid = $1")
        .bind(req.product_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let selection = match req.variation_uuid {
        Some(variation_uuid) => {
            let variation: ProductVariation =
                sqlx::query_as("SELECT * FROM product_variations WHERE variation_uuid = $1")
                    .bind(variation_uuid)
                    .fetch_optional(&s.db)
                    .await?
                    .filter(|v: &ProductVariation| v.product_uuid == product.product_uuid)
                    .ok_or_else(|| ApiError::BadRequest("Invalid variation".to_string()))?;

            match req.option_uuid {
                Some(option_uuid) => {
                    let option: VariationOption = sqlx::query_as(
                        "SELECT * FROM product_variation_options WHERE option_uuid = $1",
                    )
                    .bind(option_uuid)
                    .fetch_optional(&s.db)
                    .await?
                    .filter(|o: &VariationOption| o.variation_uuid == variation.variation_uuid)
                    .ok_or_else(|| ApiError::BadRequest("Invalid variation option".to_string()))?;

                    if option.stock < req.quantity {
                        return Err(ApiError::BadRequest("Not enough stock available".to_string()));
                    }
                    ItemSelection::Variation {
                        option_uuid: option.option_uuid,
                        name: variation.name.clone(),
                        value: option.value.clone(),
                        price: option.price,
                        sku: option.sku.clone(),
                    }
                }
                None => {
                    if variation.quantity < req.quantity {
                        return Err(ApiError::BadRequest("Not enough stock available".to_string()));
                    }
                    ItemSelection::NoVariation
                }
            }
        }
        None => {
            if req.option_uuid.is_some() {
                return Err(ApiError::BadRequest(
                    "An option requires a variation reference".to_string(),
                ));
            }
            if product.quantity < req.quantity {
                return Err(ApiError::BadRequest("Not enough stock available".to_string()));
            }
            ItemSelection::NoVariation
        }
    };

    // Merge with an existing line for the same product/variation/option.
    let existing: Option<(Uuid, i32)> = match selection.option_uuid() {
        Some(option_uuid) => {
            sqlx::query_as(
                "SELECT item_uuid, quantity FROM cart_items
                  WHERE user_uuid = $1 AND product_uuid = $2
                    AND variation_uuid IS NOT DISTINCT FROM $3
                    AND selected_option ->> 'option_uuid' = $4",
            )
            .bind(user)
            .bind(req.product_uuid)
            .bind(req.variation_uuid)
            .bind(option_uuid.to_string())
            .fetch_optional(&s.db)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT item_uuid, quantity FROM cart_items
                  WHERE user_uuid = $1 AND product_uuid = $2
                    AND variation_uuid IS NOT DISTINCT FROM $3
                    AND selected_option IS NULL",
            )
            .bind(user)
            .bind(req.product_uuid)
            .bind(req.variation_uuid)
            .fetch_optional(&s.db)
            .await?
        }
    };

    let item_uuid = match existing {
        Some((item_uuid, current)) => {
            let new_quantity = current + req.quantity;
            ensure_stock(&s.db, &selection, req.variation_uuid, &product, new_quantity).await?;
            sqlx::query("UPDATE cart_items SET quantity = $2 WHERE item_uuid = $1")
                .bind(item_uuid)
                .bind(new_quantity)
                .execute(&s.db)
                .await?;
            item_uuid
        }
        None => {
            let item_uuid = Uuid::new_v4();
            let stored = match &selection {
                ItemSelection::NoVariation => None,
                sel @ ItemSelection::Variation { .. } => Some(Jsonb(sel.clone())),
            };
            sqlx::query(
                "INSERT INTO cart_items
                    (item_uuid, user_uuid, product_uuid, variation_uuid, quantity, selected_option, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, NOW())",
            )
            .bind(item_uuid)
            .bind(user)
            .bind(req.product_uuid)
            .bind(req.variation_uuid)
            .bind(req.quantity)
            .bind(stored)
            .execute(&s.db)
            .await?;
            item_uuid
        }
    };

    let cart = fetch_cart_view(&s.db, user).await?;
    Ok(Json(AddToCartResponse { cart, item_uuid }))
}

/// Re-checks availability at the granularity the line is tracked at.
async fn ensure_stock(
    db: &PgPool,
    selection: &ItemSelection,
    variation_uuid: Option<Uuid>,
    product: &Product,
    quantity: i32,
) -> Result<(), ApiError> {
    let available: i32 = match selection.option_uuid() {
        Some(option_uuid) => {
            sqlx::query_scalar("SELECT stock FROM product_variation_options WHERE option_uuid = $1")
                .bind(option_uuid)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| ApiError::BadRequest("Invalid variation option".to_string()))?
        }
        None => match variation_uuid {
            Some(v) => sqlx::query_scalar("SELECT quantity FROM product_variations WHERE variation_uuid = $1")
                .bind(v)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| ApiError::BadRequest("Invalid variation".to_string()))?,
            None => product.quantity,
        },
    };
    if available < quantity {
        return Err(ApiError::BadRequest("Not enough stock available".to_string()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateCartItemRequest {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    quantity: i32,
}

async fn update_cart_item(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(item_uuid): Path<Uuid>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    req.validate()?;

    let item: Option<crate::model::CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE item_uuid = $1 AND user_uuid = $2")
            .bind(item_uuid)
            .bind(user)
            .fetch_optional(&s.db)
            .await?;
    let item = item.ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

    let product: Product = sqlx::query_as("SELECT * FROM products WHERE product_uuid = $1")
        .bind(item.product_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    ensure_stock(&s.db, &item.selection(), item.variation_uuid, &product, req.quantity).await?;

    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE item_uuid = $1")
        .bind(item_uuid)
        .bind(req.quantity)
        .execute(&s.db)
        .await?;

    Ok(Json(fetch_cart_view(&s.db, user).await?))
}

async fn remove_from_cart(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(item_uuid): Path<Uuid>,
) -> Result<Json<CartView>, ApiError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE item_uuid = $1 AND user_uuid = $2")
        .bind(item_uuid)
        .bind(user)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Cart item not found".to_string()));
    }
    Ok(Json(fetch_cart_view(&s.db, user).await?))
}

async fn clear_cart(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("DELETE FROM cart_items WHERE user_uuid = $1")
        .bind(user)
        .execute(&s.db)
        .await?;
    Ok(Json(serde_json::json!({"status": "success", "message": "Cart cleared successfully"})))
}
