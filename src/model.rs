//! Database rows and status enums.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::selection::ItemSelection;

// =============================================================================
// Status enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Paid,
    ToShip,
    Shipped,
    Completed,
    Cancelled,
    CancellationPending,
    CancellationRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Cod,
    CreditCard,
    Paypal,
}

impl PaymentKind {
    /// Cash-on-delivery settles at receipt, not at checkout.
    pub fn is_cod(self) -> bool {
        matches!(self, Self::Cod)
    }
}

// =============================================================================
// Tenancy
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Seller {
    pub seller_uuid: Uuid,
    pub user_uuid: Uuid,
    pub business_owner: String,
    pub business_email: String,
    pub business_phone: Option<String>,
    pub business_type: Option<String>,
    pub status: String,
    pub date_registered: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shop {
    pub shop_uuid: Uuid,
    pub seller_uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub product_uuid: Uuid,
    pub shop_uuid: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub sku: Option<String>,
    /// Denormalized rollup when variations exist; authoritative stock
    /// otherwise.
    pub quantity: i32,
    pub low_stock_alert: i32,
    pub weight: Option<Decimal>,
    pub status: String,
    pub view_count: i32,
    pub total_sales: i32,
    pub total_revenue: Decimal,
    pub discount_name: Option<String>,
    pub discount_percentage: Option<i32>,
    pub discount_start_date: Option<DateTime<Utc>>,
    pub discount_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductVariation {
    pub variation_uuid: Uuid,
    pub product_uuid: Uuid,
    pub name: String,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VariationOption {
    pub option_uuid: Uuid,
    pub variation_uuid: Uuid,
    pub value: String,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub low_stock_alert: i32,
    pub sku: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub item_uuid: Uuid,
    pub user_uuid: Uuid,
    pub product_uuid: Uuid,
    pub variation_uuid: Option<Uuid>,
    pub quantity: i32,
    pub selected_option: Option<Json<ItemSelection>>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn selection(&self) -> ItemSelection {
        match &self.selected_option {
            Some(Json(sel)) => sel.clone(),
            None => ItemSelection::NoVariation,
        }
    }
}

// =============================================================================
// Payments & orders
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub payment_method_uuid: Uuid,
    pub user_uuid: Uuid,
    pub kind: PaymentKind,
    pub is_default: bool,
    pub card_type: Option<String>,
    pub last_four: Option<String>,
    pub expiry_month: Option<i32>,
    pub expiry_year: Option<i32>,
    pub card_holder_name: Option<String>,
    pub paypal_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub order_uuid: Uuid,
    pub user_uuid: Uuid,
    pub status: OrderStatus,
    pub payment_method: PaymentKind,
    pub payment_status: PaymentStatus,
    pub shipping_address: serde_json::Value,
    pub shipping_method: String,
    pub shipping_fee: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub transaction_id: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancellation_rejection_reason: Option<String>,
    pub status_before_cancellation: Option<OrderStatus>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub order_item_uuid: Uuid,
    pub order_uuid: Uuid,
    pub product_uuid: Uuid,
    pub variation_uuid: Option<Uuid>,
    pub quantity: i32,
    /// Price captured at order time; immutable afterwards.
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub selected_option: Option<Json<ItemSelection>>,
}

impl OrderItem {
    pub fn selection(&self) -> ItemSelection {
        match &self.selected_option {
            Some(Json(sel)) => sel.clone(),
            None => ItemSelection::NoVariation,
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingProvider {
    pub provider_uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingRate {
    pub rate_uuid: Uuid,
    pub provider_uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_rate: Decimal,
    pub weight_rate: Decimal,
    pub min_weight: Decimal,
    pub max_weight: Option<Decimal>,
    pub estimated_days: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Finance
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub withdrawal_uuid: Uuid,
    pub seller_uuid: Uuid,
    pub amount: Decimal,
    pub channel: String,
    pub account_ref: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
