//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod finance;
pub mod orders;
pub mod products;
pub mod seller_orders;
pub mod sellers;
pub mod shipping;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "openmart-marketplace"})) }),
        )
        .merge(products::router())
        .merge(cart::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(seller_orders::router())
        .merge(shipping::router())
        .merge(sellers::router())
        .merge(finance::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
