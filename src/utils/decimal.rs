//! Decimal arithmetic utilities for order sizing.

use rust_decimal::Decimal;

/// Adjust a raw quantity down to the largest multiple of `step` that does
/// not exceed it.
///
/// Returns `None` when the step size is zero or negative, the sentinel for
/// a missing lot constraint. The result is never negative and never exceeds
/// `raw`: if decimal representation error ever produced a value above the
/// free balance, the guard loop walks it back one step at a time.
pub fn normalize_quantity(raw: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO || raw < Decimal::ZERO {
        return None;
    }

    let mut adjusted = (raw / step).floor() * step;
    while adjusted > raw {
        adjusted -= step;
    }
    if adjusted < Decimal::ZERO {
        adjusted = Decimal::ZERO;
    }

    // Strip trailing zeros so the exchange sees "1.234", not "1.23400".
    Some(adjusted.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_truncates_to_step_multiple() {
        assert_eq!(normalize_quantity(dec!(1.23456), dec!(0.001)), Some(dec!(1.234)));
        assert_eq!(normalize_quantity(dec!(1.567), dec!(0.01)), Some(dec!(1.56)));
        assert_eq!(normalize_quantity(dec!(1.567), dec!(0.1)), Some(dec!(1.5)));
        assert_eq!(normalize_quantity(dec!(10), dec!(1)), Some(dec!(10)));
    }

    #[test]
    fn test_zero_or_unknown_step_is_unavailable() {
        assert_eq!(normalize_quantity(dec!(1.5), Decimal::ZERO), None);
        assert_eq!(normalize_quantity(dec!(1.5), dec!(-0.001)), None);
    }

    #[test]
    fn test_never_exceeds_raw_and_is_step_aligned() {
        let steps = [dec!(0.00001), dec!(0.001), dec!(0.1), dec!(1), dec!(2.5)];
        let raws = [
            dec!(0),
            dec!(0.0000099),
            dec!(0.12345678),
            dec!(1.23456),
            dec!(99.999999),
            dec!(1000000.000001),
        ];

        for step in steps {
            for raw in raws {
                let adjusted = normalize_quantity(raw, step).unwrap();
                assert!(adjusted <= raw, "{adjusted} > {raw} for step {step}");
                assert!(adjusted >= Decimal::ZERO);
                assert_eq!(
                    adjusted % step,
                    Decimal::ZERO,
                    "{adjusted} not aligned to {step}"
                );
            }
        }
    }

    #[test]
    fn test_negative_raw_is_rejected() {
        assert_eq!(normalize_quantity(dec!(-1), dec!(0.001)), None);
    }

    #[test]
    fn test_raw_below_one_step_truncates_to_zero() {
        assert_eq!(normalize_quantity(dec!(0.0004), dec!(0.001)), Some(Decimal::ZERO));
    }
}
