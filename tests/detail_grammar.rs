//! Properties of the audit detail grammar.

use proptest::prelude::*;
use repricer::prelude::*;
use rust_decimal::Decimal;

fn amount() -> impl Strategy<Value = Decimal> {
    (0_i64..=10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn prices() -> impl Strategy<Value = PriceFields> {
    (amount(), amount(), amount()).prop_map(|(cost, cash, list)| PriceFields::new(cost, cash, list))
}

fn diff() -> impl Strategy<Value = PriceDiff> {
    (0_i64..=1_000_000, prices(), prices())
        .prop_map(|(id, before, after)| PriceDiff::between(ProductId::new(id), &before, &after))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn encoded_diffs_parse_back(diffs in prop::collection::vec(diff(), 1..6)) {
        let detail = encode_detail(&diffs);

        let parsed = parse_detail(&detail)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| TestCaseError::fail(format!("{detail:?}: {error}")))?;

        prop_assert_eq!(parsed, diffs);
    }

    #[test]
    fn restoring_a_diff_recovers_the_old_prices(
        id in 0_i64..=1_000_000,
        before in prices(),
        after in prices(),
    ) {
        let diff = PriceDiff::between(ProductId::new(id), &before, &after);
        let parsed = parse_segment(&diff.to_string()).map_err(|error| TestCaseError::fail(error.to_string()))?;

        prop_assert_eq!(parsed.restore_onto(&after), before);
    }

    #[test]
    fn every_segment_yields_one_result(detail in "[0-9a-zA-Z:;=>.|-]{1,80}") {
        let results = parse_detail(&detail);

        prop_assert_eq!(results.len(), detail.split('|').count());
    }

    #[test]
    fn arbitrary_text_never_panics(detail in "\\PC{0,200}") {
        let _results = parse_detail(&detail);
    }

    #[test]
    fn signed_amounts_are_rejected(id in 0_i64..=1_000, old in amount(), new in amount()) {
        let segment = format!("{id}:PCosto=-{old}->{new}");

        prop_assert!(parse_segment(&segment).is_err(), "{segment:?} was accepted");
    }

    #[test]
    fn unknown_fields_are_rejected(id in 0_i64..=1_000, name in "[A-Z][a-z]{2,8}") {
        prop_assume!(!matches!(name.as_str(), "PCosto" | "PContado" | "PLista"));

        let segment = format!("{id}:{name}=1->2");

        prop_assert!(
            matches!(parse_segment(&segment), Err(DetailError::UnknownField { .. })),
            "{segment:?} was not rejected as an unknown field"
        );
    }

    #[test]
    fn good_segments_survive_a_bad_neighbour(diffs in prop::collection::vec(diff(), 1..4)) {
        let detail = format!("{}|garbage", encode_detail(&diffs));
        let results = parse_detail(&detail);

        prop_assert_eq!(results.iter().filter(|result| result.is_ok()).count(), diffs.len());
        prop_assert!(results.last().is_some_and(Result::is_err), "trailing segment parsed");
    }
}
