//! Seller income and payouts.
//!
//! Income figures are derived from completed order items on demand instead of
//! being cached on the seller row.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::model::Withdrawal;
use crate::routes::sellers::require_seller;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/seller/:seller_uuid/finance/summary", get(finance_summary))
        .route(
            "/api/seller/:seller_uuid/finance/withdrawals",
            get(list_withdrawals).post(request_withdrawal),
        )
}

async fn total_income(db: &PgPool, seller_uuid: Uuid) -> Result<Decimal, ApiError> {
    let (income,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(oi.subtotal), 0)::NUMERIC
           FROM order_items oi
           JOIN orders o ON o.order_uuid = oi.order_uuid
           JOIN products p ON p.product_uuid = oi.product_uuid
           JOIN shops sh ON sh.shop_uuid = p.shop_uuid
          WHERE sh.seller_uuid = $1 AND o.status = 'completed'",
    )
    .bind(seller_uuid)
    .fetch_one(db)
    .await?;
    Ok(income)
}

async fn withdrawn_total(db: &PgPool, seller_uuid: Uuid) -> Result<Decimal, ApiError> {
    let (withdrawn,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::NUMERIC
           FROM withdrawals
          WHERE seller_uuid = $1 AND status <> 'rejected'",
    )
    .bind(seller_uuid)
    .fetch_one(db)
    .await?;
    Ok(withdrawn)
}

async fn finance_summary(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;

    let total = total_income(&s.db, seller_uuid).await?;
    let (monthly,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(oi.subtotal), 0)::NUMERIC
           FROM order_items oi
           JOIN orders o ON o.order_uuid = oi.order_uuid
           JOIN products p ON p.product_uuid = oi.product_uuid
           JOIN shops sh ON sh.shop_uuid = p.shop_uuid
          WHERE sh.seller_uuid = $1 AND o.status = 'completed'
            AND o.created_at >= DATE_TRUNC('month', NOW())",
    )
    .bind(seller_uuid)
    .fetch_one(&s.db)
    .await?;
    let withdrawn = withdrawn_total(&s.db, seller_uuid).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "total_income": total,
        "monthly_income": monthly,
        "balance": total - withdrawn,
    })))
}

async fn list_withdrawals(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
) -> Result<Json<Vec<Withdrawal>>, ApiError> {
    require_seller(&s.db, seller_uuid, user).await?;
    let withdrawals: Vec<Withdrawal> = sqlx::query_as(
        "SELECT * FROM withdrawals WHERE seller_uuid = $1 ORDER BY created_at DESC",
    )
    .bind(seller_uuid)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(withdrawals))
}

#[derive(Debug, Deserialize, Validate)]
struct WithdrawalRequest {
    amount: Decimal,
    #[validate(length(min = 1, message = "Payout channel is required"))]
    channel: String,
    #[validate(length(min = 1, message = "Payout account is required"))]
    account_ref: String,
}

async fn request_withdrawal(
    State(s): State<AppState>,
    AuthUser(user): AuthUser,
    Path(seller_uuid): Path<Uuid>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    req.validate()?;
    require_seller(&s.db, seller_uuid, user).await?;

    if req.amount <= Decimal::ZERO {
        return Err(ApiError::BadRequest("Withdrawal amount must be positive".to_string()));
    }
    let balance =
        total_income(&s.db, seller_uuid).await? - withdrawn_total(&s.db, seller_uuid).await?;
    if req.amount > balance {
        return Err(ApiError::BadRequest("Withdrawal amount exceeds available balance".to_string()));
    }

    let withdrawal: Withdrawal = sqlx::query_as(
        "INSERT INTO withdrawals
            (withdrawal_uuid, seller_uuid, amount, channel, account_ref, status, created_at)
         VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(seller_uuid)
    .bind(req.amount)
    .bind(&req.channel)
    .bind(&req.account_ref)
    .fetch_one(&s.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "message": "Withdrawal request submitted",
            "withdrawal": withdrawal,
        })),
    ))
}
