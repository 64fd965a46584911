use gst_invoice::pricing::{DiscountMode, RoundingMode, format_amount, invoice_total, line_amount};
use gst_invoice::{ItemId, LineItem};
use proptest::prelude::*;

fn row(quantity: f64, rate: f64, discount: f64, gst: f64) -> LineItem {
    LineItem {
        quantity,
        rate,
        discount_percent: discount,
        gst_percent: gst,
        ..LineItem::new(ItemId(1))
    }
}

fn percent() -> impl Strategy<Value = f64> {
    0.0..=100.0f64
}

proptest! {
    #[test]
    fn zero_quantity_or_rate_gives_zero(
        value in -1.0e6..1.0e6f64,
        discount in -200.0..200.0f64,
        gst in -200.0..200.0f64,
    ) {
        prop_assert_eq!(line_amount(&row(0.0, value, discount, gst), discount, gst), 0.0);
        prop_assert_eq!(line_amount(&row(value, 0.0, discount, gst), discount, gst), 0.0);
    }

    // stepwise f64 rounding can cost an ulp, hence the tolerance
    #[test]
    fn amount_grows_with_rate(
        quantity in 0.0..1000.0f64,
        rate in 0.0..10_000.0f64,
        bump in 0.0..10_000.0f64,
        discount in percent(),
        gst in percent(),
    ) {
        let lower = line_amount(&row(quantity, rate, discount, gst), discount, gst);
        let higher = line_amount(&row(quantity, rate + bump, discount, gst), discount, gst);
        prop_assert!(higher >= lower - 1e-9 * lower.abs().max(1.0));
    }

    #[test]
    fn amount_grows_with_quantity(
        quantity in 0.0..1000.0f64,
        bump in 0.0..1000.0f64,
        rate in 0.0..10_000.0f64,
        discount in percent(),
        gst in percent(),
    ) {
        let lower = line_amount(&row(quantity, rate, discount, gst), discount, gst);
        let higher = line_amount(&row(quantity + bump, rate, discount, gst), discount, gst);
        prop_assert!(higher >= lower - 1e-9 * lower.abs().max(1.0));
    }

    #[test]
    fn formatting_is_stable(total in -1.0e9..1.0e9f64) {
        let once = format_amount(total);
        let twice = format_amount(once.parse::<f64>().unwrap());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn rounded_total_brackets_unrounded(
        rows in prop::collection::vec((0.0..100.0f64, 0.0..1000.0f64, percent(), percent()), 0..8),
    ) {
        let items: Vec<LineItem> = rows.into_iter().map(|(q, r, d, g)| row(q, r, d, g)).collect();
        let mode = DiscountMode::PerItem;
        let exact = invoice_total(&items, &mode, RoundingMode::None);
        let up = invoice_total(&items, &mode, RoundingMode::RoundUp);
        let down = invoice_total(&items, &mode, RoundingMode::RoundDown);
        prop_assert!(down <= exact && exact <= up);
        prop_assert!(up - down <= 1.0);
        prop_assert_eq!(up.fract(), 0.0);
        prop_assert_eq!(down.fract(), 0.0);
    }

    #[test]
    fn single_item_variants_agree(
        quantity in 0.0..1000.0f64,
        rate in 0.0..10_000.0f64,
        discount in percent(),
        gst in percent(),
    ) {
        let items = vec![row(quantity, rate, discount, gst)];
        let invoice_level = DiscountMode::InvoiceLevel { discount_percent: discount, gst_percent: gst };
        for rounding in [RoundingMode::None, RoundingMode::RoundUp, RoundingMode::RoundDown] {
            prop_assert_eq!(
                invoice_total(&items, &DiscountMode::PerItem, rounding),
                invoice_total(&items, &invoice_level, rounding)
            );
        }
    }

    #[test]
    fn pricing_is_deterministic(
        quantity in -1000.0..1000.0f64,
        rate in -1000.0..1000.0f64,
        discount in -500.0..500.0f64,
        gst in -500.0..500.0f64,
    ) {
        let item = row(quantity, rate, discount, gst);
        prop_assert_eq!(line_amount(&item, discount, gst), line_amount(&item, discount, gst));
    }
}

#[test]
fn worked_example() {
    let items = vec![row(1.0, 100.0, 10.0, 18.0)];
    let mode = DiscountMode::PerItem;
    assert_eq!(format_amount(invoice_total(&items, &mode, RoundingMode::None)), "106.20");
    assert_eq!(format_amount(invoice_total(&items, &mode, RoundingMode::RoundUp)), "107.00");
    assert_eq!(format_amount(invoice_total(&items, &mode, RoundingMode::RoundDown)), "106.00");
}

#[test]
fn empty_invoice_formats_as_zero() {
    for rounding in [RoundingMode::None, RoundingMode::RoundUp, RoundingMode::RoundDown] {
        assert_eq!(format_amount(invoice_total(&[], &DiscountMode::PerItem, rounding)), "0.00");
    }
}
