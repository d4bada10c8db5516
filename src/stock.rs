//! Stock movements.
//!
//! Decrements are conditional at the storage layer (`stock >= n`), so two
//! concurrent checkouts cannot both take the last unit: the availability check
//! and the write are one statement. Option-level movements also maintain the
//! variation and product quantity rollups.

use sqlx::{Postgres, Transaction};

use crate::domain::checkout::StockRef;

/// Takes `quantity` units at the validated granularity. Returns `false` when
/// the stock was drained between validation and this write; the caller must
/// abort the transaction.
pub async fn decrement(
    tx: &mut Transaction<'_, Postgres>,
    stock: &StockRef,
    quantity: i32,
) -> sqlx::Result<bool> {
    match stock {
        StockRef::Product { product_uuid } => {
            let result = sqlx::query(
                "UPDATE products
                    SET quantity = quantity - $2, updated_at = NOW()
                  WHERE product_uuid = $1 AND quantity >= $2",
            )
            .bind(product_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            Ok(result.rows_affected() == 1)
        }
        StockRef::VariationOption { option_uuid, variation_uuid, product_uuid } => {
            let result = sqlx::query(
                "UPDATE product_variation_options
                    SET stock = stock - $2
                  WHERE option_uuid = $1 AND stock >= $2",
            )
            .bind(option_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            if result.rows_affected() != 1 {
                return Ok(false);
            }
            sqlx::query(
                "UPDATE product_variations SET quantity = quantity - $2 WHERE variation_uuid = $1",
            )
            .bind(variation_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            sqlx::query(
                "UPDATE products SET quantity = quantity - $2, updated_at = NOW()
                  WHERE product_uuid = $1",
            )
            .bind(product_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            Ok(true)
        }
    }
}

/// Puts `quantity` units back at the same granularity they were taken.
pub async fn restore(
    tx: &mut Transaction<'_, Postgres>,
    stock: &StockRef,
    quantity: i32,
) -> sqlx::Result<()> {
    match stock {
        StockRef::Product { product_uuid } => {
            sqlx::query(
                "UPDATE products
                    SET quantity = quantity + $2, updated_at = NOW()
                  WHERE product_uuid = $1",
            )
            .bind(product_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
        }
        StockRef::VariationOption { option_uuid, variation_uuid, product_uuid } => {
            sqlx::query(
                "UPDATE product_variation_options SET stock = stock + $2 WHERE option_uuid = $1",
            )
            .bind(option_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            sqlx::query(
                "UPDATE product_variations SET quantity = quantity + $2 WHERE variation_uuid = $1",
            )
            .bind(variation_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
            sqlx::query(
                "UPDATE products SET quantity = quantity + $2, updated_at = NOW()
                  WHERE product_uuid = $1",
            )
            .bind(product_uuid)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}
