use rust_decimal::{Decimal, RoundingStrategy};

pub const MONEY_SCALE: u32 = 2;

/// Division that yields `None` instead of failing when the denominator is zero.
/// Every ratio KPI goes through here.
pub fn safe_divide(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    match numerator.checked_div(denominator) {
        Some(value) => Some(value.normalize()),
        None => {
            tracing::warn!(%numerator, %denominator, "ratio overflowed, reporting it as missing");
            None
        }
    }
}

/// Rounds half away from zero and pins the scale so `100` renders as `100.00`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_denominator_is_missing_not_an_error() {
        assert_eq!(safe_divide(dec!(50), Decimal::ZERO), None);
        assert_eq!(safe_divide(Decimal::ZERO, dec!(0.00)), None);
    }

    #[test]
    fn overflow_is_missing_rather_than_a_panic() {
        assert_eq!(safe_divide(Decimal::MAX, dec!(0.5)), None);
        assert_eq!(safe_divide(Decimal::MIN, dec!(0.001)), None);
        assert!(safe_divide(Decimal::MAX, dec!(2)).is_some());
    }

    #[test]
    fn divides_exactly() {
        assert_eq!(safe_divide(dec!(500.005), dec!(100)), Some(dec!(5.00005)));
        assert_eq!(safe_divide(dec!(5), dec!(100)), Some(dec!(0.05)));
        assert_eq!(safe_divide(Decimal::ZERO, dec!(1)), Some(Decimal::ZERO));
    }

    #[test]
    fn normalizes_trailing_zeros() {
        let value = safe_divide(dec!(100.00), dec!(5)).unwrap();
        assert_eq!(value.to_string(), "20");
    }

    #[test]
    fn money_rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(500.005)), dec!(500.01));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn money_always_has_two_decimals() {
        assert_eq!(round_money(dec!(100)).to_string(), "100.00");
        assert_eq!(round_money(dec!(12.5)).to_string(), "12.50");
        assert_eq!(round_money(dec!(0)).scale(), 2);
        assert_eq!(round_money(dec!(1.23456)).scale(), 2);
    }
}
