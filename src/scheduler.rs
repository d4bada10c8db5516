//! Discount window scheduler.
//!
//! A background interval task re-evaluates every configured discount window
//! and flips prices between the compare-at (list) price and the discounted
//! price. It talks to the rest of the service only through the database. The
//! task stops itself once no product carries an active or future discount;
//! configuring a new discount re-arms it via [`DiscountScheduler::ensure_running`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

#[derive(Clone)]
pub struct DiscountScheduler {
    running: Arc<AtomicBool>,
    tick: Duration,
}

impl DiscountScheduler {
    pub fn new(tick: Duration) -> Self {
        Self { running: Arc::new(AtomicBool::new(false)), tick }
    }

    /// Spawns the sweep loop unless one is already alive.
    pub fn ensure_running(&self, pool: &PgPool) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let pool = pool.clone();
        let running = Arc::clone(&self.running);
        let tick = self.tick;
        tokio::spawn(async move {
            tracing::info!(tick_secs = tick.as_secs(), "discount scheduler started");
            let mut interval = tokio::time::interval(tick);
            // the first tick fires immediately; skip it so freshly configured
            // windows are evaluated one full period in
            interval.tick().await;
            loop {
                interval.tick().await;
                match sweep(&pool).await {
                    Ok(outcome) => {
                        if outcome.activated > 0 || outcome.expired > 0 {
                            tracing::info!(
                                activated = outcome.activated,
                                expired = outcome.expired,
                                "discount sweep applied changes"
                            );
                        }
                        if outcome.remaining == 0 {
                            tracing::info!("no active or pending discounts found, stopping scheduler");
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "discount sweep failed"),
                }
            }
            running.store(false, Ordering::SeqCst);
        });
    }
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub activated: u64,
    pub expired: u64,
    /// Products still carrying an active or future window after the sweep.
    pub remaining: i64,
}

/// One evaluation pass over every configured window. Option- and
/// variation-level prices are flipped before the product row, since product
/// expiry clears the window fields the joins rely on.
pub async fn sweep(pool: &PgPool) -> sqlx::Result<SweepOutcome> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;
    let mut outcome = SweepOutcome::default();

    // Activation: options and variations that carry their own compare-at
    // price follow their parent product's window.
    outcome.activated += sqlx::query(
        "UPDATE product_variation_options o
            SET price = ROUND(o.compare_at_price * (1 - p.discount_percentage::NUMERIC / 100), 2)
           FROM product_variations v
           JOIN products p ON p.product_uuid = v.product_uuid
          WHERE o.variation_uuid = v.variation_uuid
            AND o.compare_at_price IS NOT NULL
            AND p.discount_name IS NOT NULL
            AND p.discount_start_date <= $1 AND p.discount_end_date >= $1
            AND (o.price IS NULL
                 OR o.price <> ROUND(o.compare_at_price * (1 - p.discount_percentage::NUMERIC / 100), 2))",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    outcome.activated += sqlx::query(
        "UPDATE product_variations v
            SET price = ROUND(v.compare_at_price * (1 - p.discount_percentage::NUMERIC / 100), 2)
           FROM products p
          WHERE p.product_uuid = v.product_uuid
            AND v.compare_at_price IS NOT NULL
            AND p.discount_name IS NOT NULL
            AND p.discount_start_date <= $1 AND p.discount_end_date >= $1
            AND (v.price IS NULL
                 OR v.price <> ROUND(v.compare_at_price * (1 - p.discount_percentage::NUMERIC / 100), 2))",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    outcome.activated += sqlx::query(
        "UPDATE products
            SET compare_at_price = COALESCE(compare_at_price, price),
                price = ROUND(COALESCE(compare_at_price, price) * (1 - discount_percentage::NUMERIC / 100), 2),
                updated_at = NOW()
          WHERE discount_name IS NOT NULL
            AND discount_start_date <= $1 AND discount_end_date >= $1
            AND price <> ROUND(COALESCE(compare_at_price, price) * (1 - discount_percentage::NUMERIC / 100), 2)",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    // Expiry: restore list prices, then clear the product's window fields.
    sqlx::query(
        "UPDATE product_variation_options o
            SET price = o.compare_at_price
           FROM product_variations v
           JOIN products p ON p.product_uuid = v.product_uuid
          WHERE o.variation_uuid = v.variation_uuid
            AND o.compare_at_price IS NOT NULL
            AND p.discount_name IS NOT NULL
            AND p.discount_end_date < $1
            AND o.price IS DISTINCT FROM o.compare_at_price",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE product_variations v
            SET price = v.compare_at_price
           FROM products p
          WHERE p.product_uuid = v.product_uuid
            AND v.compare_at_price IS NOT NULL
            AND p.discount_name IS NOT NULL
            AND p.discount_end_date < $1
            AND v.price IS DISTINCT FROM v.compare_at_price",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?;

    outcome.expired = sqlx::query(
        "UPDATE products
            SET price = COALESCE(compare_at_price, price),
                discount_name = NULL,
                discount_percentage = NULL,
                discount_start_date = NULL,
                discount_end_date = NULL,
                updated_at = NOW()
          WHERE discount_name IS NOT NULL AND discount_end_date < $1",
    )
    .bind(now)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let (remaining,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products
          WHERE discount_name IS NOT NULL AND discount_end_date >= $1",
    )
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    outcome.remaining = remaining;

    tx.commit().await?;
    Ok(outcome)
}
