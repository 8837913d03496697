//! Properties of the percentage price calculator.

use proptest::prelude::*;
use repricer::prelude::*;
use rust_decimal::Decimal;

fn price() -> impl Strategy<Value = Decimal> {
    (0_i64..=100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percentage() -> impl Strategy<Value = Decimal> {
    (1_i64..=10_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn increase_never_lowers_a_price(old in price(), pct in percentage()) {
        let new = compute_new_price(old, pct, true).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(new >= old, "{old} increased by {pct}% gave {new}");
    }

    #[test]
    fn decrease_stays_between_zero_and_old(old in price(), pct in percentage()) {
        let new = compute_new_price(old, pct, false).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(new <= old, "{old} decreased by {pct}% gave {new}");
        prop_assert!(!new.is_sign_negative() || new.is_zero(), "{old} decreased by {pct}% went negative");
    }

    #[test]
    fn results_are_monotonic_in_the_old_price(
        a in price(),
        b in price(),
        pct in percentage(),
        is_increase in any::<bool>(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let new_low = compute_new_price(low, pct, is_increase).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let new_high = compute_new_price(high, pct, is_increase).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(new_low <= new_high, "{low} -> {new_low} but {high} -> {new_high}");
    }

    #[test]
    fn results_are_rounded_to_cents(old in price(), pct in percentage(), is_increase in any::<bool>()) {
        let new = compute_new_price(old, pct, is_increase).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(new.scale() <= 2, "{new} has more than two decimal places");
    }

    #[test]
    fn larger_increases_never_give_lower_prices(old in price(), a in percentage(), b in percentage()) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };

        let by_small = compute_new_price(old, small, true).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let by_large = compute_new_price(old, large, true).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert!(by_small <= by_large, "{small}% gave {by_small} but {large}% gave {by_large}");
    }

    #[test]
    fn out_of_range_percentages_are_rejected(old in price(), over in 1_i64..=1_000_000) {
        let above = Decimal::ONE_HUNDRED + Decimal::new(over, 2);
        let below = -Decimal::new(over, 2);

        prop_assert!(compute_new_price(old, above, true).is_err(), "{above}% was accepted");
        prop_assert!(compute_new_price(old, below, false).is_err(), "{below}% was accepted");
        prop_assert!(compute_new_price(old, Decimal::ZERO, true).is_err(), "0% was accepted");
    }
}
