//! Seller-side order management: shipment, direct cancellation and
//! adjudication of buyer cancellation requests.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::checkout::StockRef;
use crate::domain::order_state;
use crate::error::ApiError;
use crate::model::{Order, OrderItem, OrderStatus, PaymentKind};
use crate::routes::sellers::require_seller;
use crate::state::AppState;
use crate::{stats, stock};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/seller/:seller_uuid/orders", get(list_orders))
        .route("/api/seller/:seller_uuid/orders/:order_uuid/status", post(mark_to_ship))
        .route("/api/seller/:seller_uuid/orders/:order_uuid/ship", post(ship_order))
        .route("/api/seller/:seller_uuid/orders/:order_uuid/cancel", post(seller_cancel))
        .route(
            "/api/seller/:seller_uuid/orders/:order_uuid/cancellation/approve",
            post(approve_cancellation),
        )
        .route(
            "/api/seller/:seller_uuid/orders/:order_uuid/cancellation/reject",
            post(reject_cancellation),
        )
}

#[derive(Debug, Deserialize)]
struct OrderListParams {
    status: Option<OrderStatus>,
}

async fn list_orders(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;

    let orders: Vec<Order> = sqlx::query_as(
        "SELECT DISTINCT o.*
           FROM orders o
           JOIN order_items oi ON oi.order_uuid = o.order_uuid
           JOIN products p ON p.product_uuid = oi.product_uuid
           JOIN shops sh ON sh.shop_uuid = p.shop_uuid
          WHERE sh.seller_uuid = $1
            AND ($2::order_status IS NULL OR o.status = $2)
          ORDER BY o.created_at DESC",
    )
    .bind(seller_uuid)
    .bind(params.status)
    .fetch_all(&s.db)
    .await?;

    Ok(Json(serde_json::json!({"status": "success", "orders": orders})))
}

/// Loads the order for update, verifying it contains at least one item sold
/// by this seller.
async fn lock_seller_order(
    tx: &mut Transaction<'_, Postgres>,
    seller_uuid: Uuid,
    order_uuid: Uuid,
) -> Result<Order, ApiError> {
    sqlx::query_as(
        "SELECT o.* FROM orders o
          WHERE o.order_uuid = $1
            AND EXISTS (SELECT 1
                          FROM order_items oi
                          JOIN products p ON p.product_uuid = oi.product_uuid
                          JOIN shops sh ON sh.shop_uuid = p.shop_uuid
                         WHERE oi.order_uuid = o.order_uuid AND sh.seller_uuid = $2)
          FOR UPDATE OF o",
    )
    .bind(order_uuid)
    .bind(seller_uuid)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
}

#[derive(Debug, Deserialize)]
struct StatusTransitionRequest {
    status: OrderStatus,
}

async fn mark_to_ship(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, order_uuid)): Path<(Uuid, Uuid)>,
    Json(req): Json<StatusTransitionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    if req.status != OrderStatus::ToShip {
        return Err(ApiError::BadRequest("Unsupported status transition".to_string()));
    }

    let mut tx = s.db.begin().await?;
    let order = lock_seller_order(&mut tx, seller_uuid, order_uuid).await?;
    order_state::can_mark_to_ship(order.status).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let order: Order = sqlx::query_as(
        "UPDATE orders SET status = 'to_ship', updated_at = NOW()
          WHERE order_uuid = $1 RETURNING *",
    )
    .bind(order.order_uuid)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({"status": "success", "order": order})))
}

async fn ship_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, order_uuid)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;

    let mut tx = s.db.begin().await?;
    let order = lock_seller_order(&mut tx, seller_uuid, order_uuid).await?;
    order_state::can_ship(order.status, order.shipped_at.is_some())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let order: Order = sqlx::query_as(
        "UPDATE orders SET status = 'shipped', shipped_at = NOW(), updated_at = NOW()
          WHERE order_uuid = $1 RETURNING *",
    )
    .bind(order.order_uuid)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({"status": "success", "order": order})))
}

/// Puts back stock and reverses the statistics applied at order creation, at
/// the same granularity the checkout used. Revenue is only reversed when it
/// was recognized at checkout (prepaid orders); COD revenue is deferred until
/// receipt and completed orders are past cancellation.
async fn restore_order_effects(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> Result<(), ApiError> {
    let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_uuid = $1")
        .bind(order.order_uuid)
        .fetch_all(&mut **tx)
        .await?;

    let prepaid = order.payment_method != PaymentKind::Cod;
    for item in &items {
        let stock_ref = match (item.variation_uuid, item.selection().option_uuid()) {
            (Some(variation_uuid), Some(option_uuid)) => StockRef::VariationOption {
                option_uuid,
                variation_uuid,
                product_uuid: item.product_uuid,
            },
            _ => StockRef::Product { product_uuid: item.product_uuid },
        };
        stock::restore(tx, &stock_ref, item.quantity).await?;
        let revenue = prepaid.then_some(item.subtotal);
        stats::reverse_sale(tx, item.product_uuid, item.quantity, revenue).await?;
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SellerCancelRequest {
    reason: Option<String>,
}

async fn seller_cancel(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, order_uuid)): Path<(Uuid, Uuid)>,
    Json(req): Json<SellerCancelRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;

    let mut tx = s.db.begin().await?;
    let order = lock_seller_order(&mut tx, seller_uuid, order_uuid).await?;
    order_state::can_seller_cancel(order.status, order.shipped_at.is_some())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    restore_order_effects(&mut tx, &order).await?;
    let order: Order = sqlx::query_as(
        "UPDATE orders
            SET status = 'cancelled', cancelled_at = NOW(),
                cancellation_reason = COALESCE($2, cancellation_reason),
                updated_at = NOW()
          WHERE order_uuid = $1 RETURNING *",
    )
    .bind(order.order_uuid)
    .bind(&req.reason)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Order cancelled",
        "order": order,
    })))
}

async fn approve_cancellation(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, order_uuid)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;

    let mut tx = s.db.begin().await?;
    let order = lock_seller_order(&mut tx, seller_uuid, order_uuid).await?;
    order_state::can_adjudicate_cancellation(order.status)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    restore_order_effects(&mut tx, &order).await?;
    let order: Order = sqlx::query_as(
        "UPDATE orders
            SET status = 'cancelled', cancelled_at = NOW(),
                status_before_cancellation = NULL, updated_at = NOW()
          WHERE order_uuid = $1 RETURNING *",
    )
    .bind(order.order_uuid)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Cancellation approved",
        "order": order,
    })))
}

#[derive(Debug, Deserialize, Validate)]
struct RejectCancellationRequest {
    #[validate(length(min = 1, message = "A rejection reason is required"))]
    reason: String,
}

async fn reject_cancellation(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path((seller_uuid, order_uuid)): Path<(Uuid, Uuid)>,
    Json(req): Json<RejectCancellationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;

    let mut tx = s.db.begin().await?;
    let order = lock_seller_order(&mut tx, seller_uuid, order_uuid).await?;
    order_state::can_adjudicate_cancellation(order.status)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // The order returns to the status it held before the request; the
    // rejection reason stays on the row for the buyer to see.
    let order: Order = sqlx::query_as(
        "UPDATE orders
            SET status = COALESCE(status_before_cancellation, 'cancellation_rejected'),
                cancellation_rejection_reason = $2,
                status_before_cancellation = NULL,
                updated_at = NOW()
          WHERE order_uuid = $1 RETURNING *",
    )
    .bind(order.order_uuid)
    .bind(&req.reason)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Cancellation rejected",
        "order": order,
    })))
}
