//! Shipping fee formula.

use rust_decimal::Decimal;

/// `base_rate + weight_rate * billable_weight`, where weights under
/// `min_weight` are billed at `min_weight`. Returns `None` when the parcel
/// exceeds the rate's `max_weight`.
pub fn shipping_fee(
    base_rate: Decimal,
    weight_rate: Decimal,
    min_weight: Decimal,
    max_weight: Option<Decimal>,
    weight: Decimal,
) -> Option<Decimal> {
    if let Some(max) = max_weight {
        if weight > max {
            return None;
        }
    }
    let billable = weight.max(min_weight);
    Some((base_rate + weight_rate * billable).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_linear_fee() {
        // 50.00 base + 10.00/kg * 2.5kg = 75.00
        let fee = shipping_fee(d(5000), d(1000), Decimal::ZERO, None, Decimal::new(25, 1));
        assert_eq!(fee, Some(d(7500)));
    }

    #[test]
    fn test_minimum_weight_applies() {
        // 0.2kg billed as 1kg
        let fee = shipping_fee(d(5000), d(1000), Decimal::ONE, None, Decimal::new(2, 1));
        assert_eq!(fee, Some(d(6000)));
    }

    #[test]
    fn test_over_max_weight_rejected() {
        let fee = shipping_fee(d(5000), d(1000), Decimal::ZERO, Some(Decimal::from(30)), Decimal::from(31));
        assert_eq!(fee, None);
    }

    #[test]
    fn test_max_weight_boundary_allowed() {
        let fee = shipping_fee(d(5000), d(1000), Decimal::ZERO, Some(Decimal::from(30)), Decimal::from(30));
        assert_eq!(fee, Some(d(35000)));
    }
}
