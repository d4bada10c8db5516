//! Discount window arithmetic shared by the scheduler and the discount
//! configuration endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// `now` is before the start of the window.
    Pending,
    /// `now` is inside `[start, end]`.
    Active,
    /// The window has fully elapsed.
    Expired,
}

pub fn window_phase(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> WindowPhase {
    if now < start {
        WindowPhase::Pending
    } else if now <= end {
        WindowPhase::Active
    } else {
        WindowPhase::Expired
    }
}

/// Effective selling price while a window is active: the compare-at (list)
/// price reduced by the stored percentage, rounded to cents.
pub fn discounted_price(compare_at: Decimal, percentage: i32) -> Decimal {
    let factor = Decimal::ONE - Decimal::from(percentage) / Decimal::from(100);
    (compare_at * factor).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_phases() {
        let now = Utc::now();
        assert_eq!(
            window_phase(now, now + Duration::hours(1), now + Duration::hours(2)),
            WindowPhase::Pending
        );
        assert_eq!(
            window_phase(now, now - Duration::hours(1), now + Duration::hours(1)),
            WindowPhase::Active
        );
        assert_eq!(
            window_phase(now, now - Duration::hours(2), now - Duration::hours(1)),
            WindowPhase::Expired
        );
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let now = Utc::now();
        assert_eq!(window_phase(now, now, now + Duration::hours(1)), WindowPhase::Active);
        assert_eq!(window_phase(now, now - Duration::hours(1), now), WindowPhase::Active);
    }

    #[test]
    fn test_twenty_percent_off_hundred() {
        // compare_at 100.00 at 20% -> 80.00
        assert_eq!(
            discounted_price(Decimal::new(10000, 2), 20),
            Decimal::new(8000, 2)
        );
    }

    #[test]
    fn test_rounding_to_cents() {
        // 19.99 at 15% -> 16.9915 -> 16.99
        assert_eq!(
            discounted_price(Decimal::new(1999, 2), 15),
            Decimal::new(1699, 2)
        );
    }
}
