//! Buyer-side order views and receipt confirmation.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::order_state;
use crate::error::ApiError;
use crate::model::{Order, OrderItem, PaymentKind};
use crate::state::AppState;
use crate::stats;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(get_user_orders))
        .route("/api/orders/:order_uuid", get(get_order_details))
        .route("/api/orders/:order_uuid/receive", post(receive_order))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub async fn load_items(db: &sqlx::PgPool, order_uuid: Uuid) -> Result<Vec<OrderItem>, ApiError> {
    Ok(sqlx::query_as("SELECT * FROM order_items WHERE order_uuid = $1")
        .bind(order_uuid)
        .fetch_all(db)
        .await?)
}

async fn get_user_orders(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_uuid = $1 ORDER BY created_at DESC")
            .bind(user)
            .fetch_all(&s.db)
            .await?;
    Ok(Json(serde_json::json!({"status": "success", "orders": orders})))
}

async fn get_order_details(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(order_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order: Order =
        sqlx::query_as("SELECT * FROM orders WHERE order_uuid = $1 AND user_uuid = $2")
            .bind(order_uuid)
            .bind(user)
            .fetch_optional(&s.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    let items = load_items(&s.db, order.order_uuid).await?;
    Ok(Json(serde_json::json!({"status": "success", "order": OrderDetail { order, items }})))
}

/// Buyer confirms receipt. For cash-on-delivery this is also the settlement
/// point: payment completes and product revenue is recognized, exactly once.
async fn receive_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(order_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut tx = s.db.begin().await?;

    let order: Order = sqlx::query_as(
        "SELECT * FROM orders WHERE order_uuid = $1 AND user_uuid = $2 FOR UPDATE",
    )
    .bind(order_uuid)
    .bind(user)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    order_state::can_receive(order.status, order.shipped_at.is_some(), order.delivered_at.is_some())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let cod = order.payment_method == PaymentKind::Cod;
    if cod {
        sqlx::query(
            "UPDATE orders
                SET delivered_at = NOW(), status = 'completed',
                    payment_status = 'completed', paid_at = NOW(), updated_at = NOW()
              WHERE order_uuid = $1",
        )
        .bind(order.order_uuid)
        .execute(&mut *tx)
        .await?;

        let items: Vec<OrderItem> = sqlx::query_as("SELECT * FROM order_items WHERE order_uuid = $1")
            .bind(order.order_uuid)
            .fetch_all(&mut *tx)
            .await?;
        for item in &items {
            let amount = item.unit_price * Decimal::from(item.quantity);
            stats::recognize_revenue(&mut tx, item.product_uuid, amount).await?;
        }
    } else {
        sqlx::query(
            "UPDATE orders
                SET delivered_at = NOW(), status = 'completed', updated_at = NOW()
              WHERE order_uuid = $1",
        )
        .bind(order.order_uuid)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Order marked as received successfully",
    })))
}
