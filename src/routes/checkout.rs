//! Checkout: payment methods, order placement, payment confirmation and
//! buyer-initiated cancellation requests.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json as Jsonb;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::checkout::{
    price_cart, CheckoutError, LineInput, OptionSnapshot, ProductSnapshot, VariationSnapshot,
};
use crate::domain::order_state;
use crate::domain::selection::ItemSelection;
use crate::error::ApiError;
use crate::model::{
    CartItem, Order, OrderItem, OrderStatus, PaymentKind, PaymentMethod, PaymentStatus, Product,
    ProductVariation, VariationOption,
};
use crate::notify::OrderNotification;
use crate::routes::orders::OrderDetail;
use crate::state::AppState;
use crate::{stats, stock};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/checkout/payment-methods",
            get(get_payment_methods).post(add_payment_method),
        )
        .route("/api/checkout/process", post(process_checkout))
        .route("/api/checkout/process-payment", post(process_payment))
        .route("/api/checkout/cancel-order", post(cancel_order))
}

async fn get_payment_methods(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let methods: Vec<PaymentMethod> =
        sqlx::query_as("SELECT * FROM payment_methods WHERE user_uuid = $1 ORDER BY created_at")
            .bind(user)
            .fetch_all(&s.db)
            .await?;
    Ok(Json(serde_json::json!({"status": "success", "payment_methods": methods})))
}

#[derive(Debug, Deserialize, Validate)]
struct AddPaymentMethodRequest {
    kind: PaymentKind,
    #[serde(default)]
    is_default: bool,
    card_type: Option<String>,
    card_number: Option<String>,
    #[validate(range(min = 1, max = 12))]
    expiry_month: Option<i32>,
    expiry_year: Option<i32>,
    card_holder_name: Option<String>,
    #[validate(email)]
    paypal_email: Option<String>,
}

async fn add_payment_method(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddPaymentMethodRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate()?;

    let last_four = match req.kind {
        PaymentKind::CreditCard => {
            let number = req
                .card_number
                .as_deref()
                .filter(|n| n.len() >= 4)
                .ok_or_else(|| ApiError::BadRequest("Card details are incomplete".to_string()))?;
            if req.card_holder_name.is_none()
                || req.expiry_month.is_none()
                || req.expiry_year.is_none()
            {
                return Err(ApiError::BadRequest("Card details are incomplete".to_string()));
            }
            Some(number[number.len() - 4..].to_string())
        }
        PaymentKind::Paypal => {
            if req.paypal_email.is_none() {
                return Err(ApiError::BadRequest("PayPal email is required".to_string()));
            }
            None
        }
        PaymentKind::Cod => None,
    };

    if req.is_default {
        sqlx::query("UPDATE payment_methods SET is_default = FALSE WHERE user_uuid = $1")
            .bind(user)
            .execute(&s.db)
            .await?;
    }

    let method: PaymentMethod = sqlx::query_as(
        "INSERT INTO payment_methods
            (payment_method_uuid, user_uuid, kind, is_default, card_type, last_four,
             expiry_month, expiry_year, card_holder_name, paypal_email, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user)
    .bind(req.kind)
    .bind(req.is_default)
    .bind(&req.card_type)
    .bind(&last_four)
    .bind(req.expiry_month)
    .bind(req.expiry_year)
    .bind(&req.card_holder_name)
    .bind(&req.paypal_email)
    .fetch_one(&s.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Payment method added successfully",
            "payment_method": method,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct CheckoutItemRef {
    product_uuid: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProcessCheckoutRequest {
    items: Vec<CheckoutItemRef>,
    shipping_address: serde_json::Value,
    payment_method_uuid: Uuid,
    shipping_fee: Decimal,
    shipping_method: Option<String>,
}

/// Persistence errors inside the checkout sequence surface as one generic
/// failure; the transaction rolls back on drop.
fn checkout_failure(e: sqlx::Error) -> ApiError {
    ApiError::BadRequest(format!("Failed to process order: {e}"))
}

async fn process_checkout(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ProcessCheckoutRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if req.shipping_fee < Decimal::ZERO {
        return Err(ApiError::BadRequest("Shipping fee cannot be negative".to_string()));
    }

    let method: PaymentMethod = sqlx::query_as(
        "SELECT * FROM payment_methods WHERE payment_method_uuid = $1 AND user_uuid = $2",
    )
    .bind(req.payment_method_uuid)
    .bind(user)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::BadRequest(CheckoutError::InvalidPaymentMethod.to_string()))?;

    // Resolve the referenced lines from the stored cart; the client payload
    // only names products, never prices or quantities.
    let mut product_refs: Vec<Uuid> = req.items.iter().map(|i| i.product_uuid).collect();
    product_refs.sort_unstable();
    product_refs.dedup();

    let cart_lines: Vec<CartItem> = sqlx::query_as(
        "SELECT * FROM cart_items
          WHERE user_uuid = $1 AND product_uuid = ANY($2)
          ORDER BY created_at",
    )
    .bind(user)
    .bind(&product_refs)
    .fetch_all(&s.db)
    .await?;

    let mut inputs = Vec::with_capacity(cart_lines.len());
    for line in &cart_lines {
        let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE product_uuid = $1")
            .bind(line.product_uuid)
            .fetch_optional(&s.db)
            .await?;
        let variation: Option<ProductVariation> = match line.variation_uuid {
            Some(v) => {
                sqlx::query_as("SELECT * FROM product_variations WHERE variation_uuid = $1")
                    .bind(v)
                    .fetch_optional(&s.db)
                    .await?
            }
            None => None,
        };
        let selection = line.selection();
        let option: Option<VariationOption> = match selection.option_uuid() {
            Some(o) => {
                sqlx::query_as("SELECT * FROM product_variation_options WHERE option_uuid = $1")
                    .bind(o)
                    .fetch_optional(&s.db)
                    .await?
            }
            None => None,
        };
        inputs.push(LineInput {
            cart_item_uuid: line.item_uuid,
            product_uuid: line.product_uuid,
            variation_ref: line.variation_uuid,
            selection,
            quantity: line.quantity,
            product: product.map(|p| ProductSnapshot {
                product_uuid: p.product_uuid,
                name: p.name,
                price: p.price,
                quantity: p.quantity,
            }),
            variation: variation.map(|v| VariationSnapshot {
                variation_uuid: v.variation_uuid,
                product_uuid: v.product_uuid,
            }),
            option: option.map(|o| OptionSnapshot {
                option_uuid: o.option_uuid,
                variation_uuid: o.variation_uuid,
                value: o.value,
                price: o.price,
                stock: o.stock,
            }),
        });
    }

    let draft = price_cart(inputs, req.shipping_fee)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let status = if method.kind.is_cod() { OrderStatus::Processing } else { OrderStatus::Pending };

    let mut tx = s.db.begin().await.map_err(checkout_failure)?;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders
            (order_uuid, user_uuid, status, payment_method, payment_status,
             shipping_address, shipping_method, shipping_fee, subtotal, total,
             created_at, updated_at)
         VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, NOW(), NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user)
    .bind(status)
    .bind(method.kind)
    .bind(&req.shipping_address)
    .bind(req.shipping_method.as_deref().unwrap_or("standard"))
    .bind(draft.shipping_fee)
    .bind(draft.subtotal)
    .bind(draft.total)
    .fetch_one(&mut *tx)
    .await
    .map_err(checkout_failure)?;

    let mut items = Vec::with_capacity(draft.lines.len());
    for line in &draft.lines {
        let stored_selection = match &line.selection {
            ItemSelection::NoVariation => None,
            sel @ ItemSelection::Variation { .. } => Some(Jsonb(sel.clone())),
        };
        let item: OrderItem = sqlx::query_as(
            "INSERT INTO order_items
                (order_item_uuid, order_uuid, product_uuid, variation_uuid,
                 quantity, unit_price, subtotal, selected_option)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(order.order_uuid)
        .bind(line.product_uuid)
        .bind(line.variation_uuid)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .bind(stored_selection)
        .fetch_one(&mut *tx)
        .await
        .map_err(checkout_failure)?;

        // Conditional decrement at the granularity validation used; a
        // concurrent checkout that drained the stock fails the whole order.
        if !stock::decrement(&mut tx, &line.stock, line.quantity)
            .await
            .map_err(checkout_failure)?
        {
            return Err(ApiError::BadRequest(
                CheckoutError::InsufficientStock(line.selection.describe(&line.product_name))
                    .to_string(),
            ));
        }

        let revenue = (!method.kind.is_cod()).then_some(line.subtotal);
        stats::record_sale(&mut tx, line.product_uuid, line.quantity, revenue)
            .await
            .map_err(checkout_failure)?;
        items.push(item);
    }

    let consumed: Vec<Uuid> = draft.lines.iter().map(|l| l.cart_item_uuid).collect();
    sqlx::query("DELETE FROM cart_items WHERE item_uuid = ANY($1)")
        .bind(&consumed)
        .execute(&mut *tx)
        .await
        .map_err(checkout_failure)?;

    tx.commit().await.map_err(checkout_failure)?;

    if method.kind.is_cod() {
        s.notifier.publish(OrderNotification::invoice(&order)).await;
        s.notifier.publish(OrderNotification::confirmation(&order)).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Order placed successfully",
            "order": OrderDetail { order, items },
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct ProcessPaymentRequest {
    order_uuid: Uuid,
    payment_method_uuid: Uuid,
    amount: Decimal,
    status: PaymentStatus,
}

async fn process_payment(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ProcessPaymentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE order_uuid = $1")
        .bind(req.order_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    if order.user_uuid != user {
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    sqlx::query("SELECT 1 FROM payment_methods WHERE payment_method_uuid = $1 AND user_uuid = $2")
        .bind(req.payment_method_uuid)
        .bind(user)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::BadRequest(CheckoutError::InvalidPaymentMethod.to_string()))?;

    if req.amount != order.total {
        return Err(ApiError::BadRequest("Payment amount does not match order total".to_string()));
    }

    let completed = req.status == PaymentStatus::Completed;
    let new_status = if completed { OrderStatus::Paid } else { OrderStatus::Pending };
    let paid_at = completed.then(Utc::now);
    let transaction_id = completed.then(|| format!("TXN-{:010}", rand::random::<u32>()));

    let order: Order = sqlx::query_as(
        "UPDATE orders
            SET payment_status = $2, status = $3, paid_at = $4,
                transaction_id = COALESCE($5, transaction_id), updated_at = NOW()
          WHERE order_uuid = $1
          RETURNING *",
    )
    .bind(order.order_uuid)
    .bind(req.status)
    .bind(new_status)
    .bind(paid_at)
    .bind(&transaction_id)
    .fetch_one(&s.db)
    .await?;

    // The payment is already committed; notification trouble stays here.
    if completed {
        s.notifier.publish(OrderNotification::invoice(&order)).await;
        s.notifier.publish(OrderNotification::confirmation(&order)).await;
    }

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": if completed { "Payment processed successfully" } else { "Payment status updated" },
        "order": order,
    })))
}

#[derive(Debug, Deserialize, Validate)]
struct CancelOrderRequest {
    order_uuid: Uuid,
    #[validate(length(min = 1, message = "A cancellation reason is required"))]
    reason: String,
}

async fn cancel_order(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    req.validate()?;

    let order: Order = sqlx::query_as("SELECT * FROM orders WHERE order_uuid = $1")
        .bind(req.order_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    if order.user_uuid != user {
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }

    order_state::can_request_cancellation(
        order.status,
        order.shipped_at.is_some(),
        order.delivered_at.is_some(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    sqlx::query(
        "UPDATE orders
            SET status = 'cancellation_pending',
                status_before_cancellation = $2,
                cancellation_reason = $3,
                cancellation_requested_at = NOW(),
                updated_at = NOW()
          WHERE order_uuid = $1",
    )
    .bind(order.order_uuid)
    .bind(order.status)
    .bind(&req.reason)
    .execute(&s.db)
    .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Cancellation request submitted successfully",
    })))
}
