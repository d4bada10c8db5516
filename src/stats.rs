//! Product sales statistics.
//!
//! `total_sales` / `total_revenue` are cached rollups; every path that touches
//! them goes through this module so checkout, receipt and cancellation stay
//! symmetric. Sales are counted when the order is placed. Revenue is
//! recognized exactly once: at checkout for prepaid orders, at buyer receipt
//! for cash-on-delivery.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn record_sale(
    tx: &mut Transaction<'_, Postgres>,
    product_uuid: Uuid,
    quantity: i32,
    revenue: Option<Decimal>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE products
            SET total_sales = total_sales + $2,
                total_revenue = total_revenue + COALESCE($3, 0),
                updated_at = NOW()
          WHERE product_uuid = $1",
    )
    .bind(product_uuid)
    .bind(quantity)
    .bind(revenue)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Exact inverse of [`record_sale`] with the amounts applied at order time.
pub async fn reverse_sale(
    tx: &mut Transaction<'_, Postgres>,
    product_uuid: Uuid,
    quantity: i32,
    revenue: Option<Decimal>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE products
            SET total_sales = total_sales - $2,
                total_revenue = total_revenue - COALESCE($3, 0),
                updated_at = NOW()
          WHERE product_uuid = $1",
    )
    .bind(product_uuid)
    .bind(quantity)
    .bind(revenue)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// COD revenue recognition at buyer receipt.
pub async fn recognize_revenue(
    tx: &mut Transaction<'_, Postgres>,
    product_uuid: Uuid,
    amount: Decimal,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE products
            SET total_revenue = total_revenue + $2,
                updated_at = NOW()
          WHERE product_uuid = $1",
    )
    .bind(product_uuid)
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
