//! Shipping providers, rates and fee calculation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::shipping::shipping_fee;
use crate::error::ApiError;
use crate::model::{ShippingProvider, ShippingRate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/shipping/providers", get(list_providers).post(create_provider))
        .route(
            "/api/shipping/providers/:provider_uuid",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route(
            "/api/shipping/providers/:provider_uuid/rates",
            get(list_rates).post(create_rate),
        )
        .route(
            "/api/shipping/rates/:rate_uuid",
            get(get_rate).put(update_rate).delete(delete_rate),
        )
        .route("/api/shipping/providers/active", get(list_active_providers))
        .route("/api/shipping/rates/:rate_uuid/calculate", post(calculate_fee))
}

async fn list_providers(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<ShippingProvider>>, ApiError> {
    let providers: Vec<ShippingProvider> =
        sqlx::query_as("SELECT * FROM shipping_providers ORDER BY name")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(providers))
}

async fn list_active_providers(
    State(s): State<AppState>,
) -> Result<Json<Vec<ShippingProvider>>, ApiError> {
    let providers: Vec<ShippingProvider> =
        sqlx::query_as("SELECT * FROM shipping_providers WHERE is_active = TRUE ORDER BY name")
            .fetch_all(&s.db)
            .await?;
    Ok(Json(providers))
}

#[derive(Debug, Deserialize, Validate)]
struct ProviderRequest {
    #[validate(length(min = 1, message = "Provider name is required"))]
    name: String,
    description: Option<String>,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    is_default: bool,
}

fn default_true() -> bool {
    true
}

async fn create_provider(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(req): Json<ProviderRequest>,
) -> Result<(StatusCode, Json<ShippingProvider>), ApiError> {
    req.validate()?;

    if req.is_default {
        sqlx::query("UPDATE shipping_providers SET is_default = FALSE WHERE is_default = TRUE")
            .execute(&s.db)
            .await?;
    }

    let provider: ShippingProvider = sqlx::query_as(
        "INSERT INTO shipping_providers
            (provider_uuid, name, description, is_active, is_default, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.is_active)
    .bind(req.is_default)
    .fetch_one(&s.db)
    .await?;

    Ok((StatusCode::CREATED, Json(provider)))
}

async fn get_provider(
    State(s): State<AppState>,
    Path(provider_uuid): Path<Uuid>,
) -> Result<Json<ShippingProvider>, ApiError> {
    sqlx::query_as("SELECT * FROM shipping_providers WHERE provider_uuid = $1")
        .bind(provider_uuid)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Shipping provider not found".to_string()))
}

async fn update_provider(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(provider_uuid): Path<Uuid>,
    Json(req): Json<ProviderRequest>,
) -> Result<Json<ShippingProvider>, ApiError> {
    req.validate()?;

    if req.is_default {
        sqlx::query(
            "UPDATE shipping_providers SET is_default = FALSE
              WHERE is_default = TRUE AND provider_uuid <> $1",
        )
        .bind(provider_uuid)
        .execute(&s.db)
        .await?;
    }

    let provider: ShippingProvider = sqlx::query_as(
        "UPDATE shipping_providers
            SET name = $2, description = $3, is_active = $4, is_default = $5
          WHERE provider_uuid = $1
          RETURNING *",
    )
    .bind(provider_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.is_active)
    .bind(req.is_default)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Shipping provider not found".to_string()))?;

    Ok(Json(provider))
}

async fn delete_provider(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(provider_uuid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let provider: ShippingProvider =
        sqlx::query_as("SELECT * FROM shipping_providers WHERE provider_uuid = $1")
            .bind(provider_uuid)
            .fetch_optional(&s.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Shipping provider not found".to_string()))?;
    if provider.is_default {
        return Err(ApiError::BadRequest(
            "Cannot delete the default shipping provider".to_string(),
        ));
    }
    sqlx::query("DELETE FROM shipping_providers WHERE provider_uuid = $1")
        .bind(provider_uuid)
        .execute(&s.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_rates(
    State(s): State<AppState>,
    Path(provider_uuid): Path<Uuid>,
) -> Result<Json<Vec<ShippingRate>>, ApiError> {
    sqlx::query("SELECT 1 FROM shipping_providers WHERE provider_uuid = $1")
        .bind(provider_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shipping provider not found".to_string()))?;
    let rates: Vec<ShippingRate> = sqlx::query_as(
        "SELECT * FROM shipping_rates WHERE provider_uuid = $1 AND is_active = TRUE ORDER BY name",
    )
    .bind(provider_uuid)
    .fetch_all(&s.db)
    .await?;
    Ok(Json(rates))
}

#[derive(Debug, Deserialize, Validate)]
struct RateRequest {
    #[validate(length(min = 1, message = "Rate name is required"))]
    name: String,
    description: Option<String>,
    base_rate: Decimal,
    weight_rate: Decimal,
    #[serde(default)]
    min_weight: Decimal,
    max_weight: Option<Decimal>,
    estimated_days: Option<String>,
    #[serde(default = "default_true")]
    is_active: bool,
}

impl RateRequest {
    fn check_amounts(&self) -> Result<(), ApiError> {
        if self.base_rate < Decimal::ZERO || self.weight_rate < Decimal::ZERO {
            return Err(ApiError::BadRequest("Rates cannot be negative".to_string()));
        }
        if let Some(max) = self.max_weight {
            if max < self.min_weight {
                return Err(ApiError::BadRequest(
                    "Maximum weight must not be below minimum weight".to_string(),
                ));
            }
        }
        Ok(())
    }
}

async fn create_rate(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(provider_uuid): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> Result<(StatusCode, Json<ShippingRate>), ApiError> {
    req.validate()?;
    req.check_amounts()?;

    sqlx::query("SELECT 1 FROM shipping_providers WHERE provider_uuid = $1")
        .bind(provider_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shipping provider not found".to_string()))?;

    let rate: ShippingRate = sqlx::query_as(
        "INSERT INTO shipping_rates
            (rate_uuid, provider_uuid, name, description, base_rate, weight_rate,
             min_weight, max_weight, estimated_days, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(provider_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.base_rate)
    .bind(req.weight_rate)
    .bind(req.min_weight)
    .bind(req.max_weight)
    .bind(&req.estimated_days)
    .bind(req.is_active)
    .fetch_one(&s.db)
    .await?;

    Ok((StatusCode::CREATED, Json(rate)))
}

async fn get_rate(
    State(s): State<AppState>,
    Path(rate_uuid): Path<Uuid>,
) -> Result<Json<ShippingRate>, ApiError> {
    sqlx::query_as("SELECT * FROM shipping_rates WHERE rate_uuid = $1")
        .bind(rate_uuid)
        .fetch_optional(&s.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Shipping rate not found".to_string()))
}

async fn update_rate(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(rate_uuid): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> Result<Json<ShippingRate>, ApiError> {
    req.validate()?;
    req.check_amounts()?;

    let rate: ShippingRate = sqlx::query_as(
        "UPDATE shipping_rates
            SET name = $2, description = $3, base_rate = $4, weight_rate = $5,
                min_weight = $6, max_weight = $7, estimated_days = $8, is_active = $9
          WHERE rate_uuid = $1
          RETURNING *",
    )
    .bind(rate_uuid)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.base_rate)
    .bind(req.weight_rate)
    .bind(req.min_weight)
    .bind(req.max_weight)
    .bind(&req.estimated_days)
    .bind(req.is_active)
    .fetch_optional(&s.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Shipping rate not found".to_string()))?;

    Ok(Json(rate))
}

async fn delete_rate(
    State(s): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(rate_uuid): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM shipping_rates WHERE rate_uuid = $1")
        .bind(rate_uuid)
        .execute(&s.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Shipping rate not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CalculateFeeRequest {
    weight: Decimal,
}

async fn calculate_fee(
    State(s): State<AppState>,
    Path(rate_uuid): Path<Uuid>,
    Json(req): Json<CalculateFeeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.weight < Decimal::ZERO {
        return Err(ApiError::BadRequest("Weight cannot be negative".to_string()));
    }
    let rate: ShippingRate = sqlx::query_as("SELECT * FROM shipping_rates WHERE rate_uuid = $1")
        .bind(rate_uuid)
        .fetch_optional(&s.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shipping rate not found".to_string()))?;

    let fee = shipping_fee(rate.base_rate, rate.weight_rate, rate.min_weight, rate.max_weight, req.weight)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Weight exceeds maximum limit of {}kg for this shipping rate",
                rate.max_weight.unwrap_or_default()
            ))
        })?;

    Ok(Json(serde_json::json!({"shipping_fee": fee, "rate": rate})))
}
