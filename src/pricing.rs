//! Line amounts and invoice totals.
//!
//! Everything here is pure `f64` arithmetic. Discount is taken off the base
//! before tax is computed on what remains, and rounding is applied once, to
//! the final total only.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::model::LineItem;

/// The intermediate values of one discount-then-tax computation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Breakdown {
    pub base: f64,
    pub discount_amount: f64,
    pub taxable_base: f64,
    pub tax_amount: f64,
    pub amount: f64,
}

impl Breakdown {
    /// Apply `discount_percent` to `base`, then `gst_percent` to the result.
    /// The order of operations is fixed; callers rely on it for
    /// reproducible floating point results.
    pub fn compute(base: f64, discount_percent: f64, gst_percent: f64) -> Self {
        let discount_amount = base * discount_percent / 100.0;
        let taxable_base = base - discount_amount;
        let tax_amount = taxable_base * gst_percent / 100.0;
        let amount = taxable_base + tax_amount;
        Self { base, discount_amount, taxable_base, tax_amount, amount }
    }

    fn accumulate(self, other: Breakdown) -> Self {
        Self {
            base: self.base + other.base,
            discount_amount: self.discount_amount + other.discount_amount,
            taxable_base: self.taxable_base + other.taxable_base,
            tax_amount: self.tax_amount + other.tax_amount,
            amount: self.amount + other.amount,
        }
    }
}

/// Amount of one row under the given effective rates.
pub fn line_amount(item: &LineItem, discount_percent: f64, gst_percent: f64) -> f64 {
    Breakdown::compute(item.base(), discount_percent, gst_percent).amount
}

/// Where discount and tax rates come from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DiscountMode {
    /// Every row carries its own discount and GST rate.
    PerItem,
    /// One discount and GST rate, applied once to the subtotal of all rows.
    InvoiceLevel { discount_percent: f64, gst_percent: f64 },
}

impl DiscountMode {
    /// Rates that apply to `item` when its amount is shown on its own line.
    pub fn effective_rates(&self, item: &LineItem) -> (f64, f64) {
        match *self {
            DiscountMode::PerItem => (item.discount_percent, item.gst_percent),
            DiscountMode::InvoiceLevel { discount_percent, gst_percent } => {
                (discount_percent, gst_percent)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    #[default]
    None,
    #[value(name = "up")]
    #[serde(rename = "up")]
    RoundUp,
    #[value(name = "down")]
    #[serde(rename = "down")]
    RoundDown,
}

impl RoundingMode {
    pub fn apply(self, total: f64) -> f64 {
        match self {
            RoundingMode::None => total,
            RoundingMode::RoundUp => total.ceil(),
            RoundingMode::RoundDown => total.floor(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoundingMode::None => "None",
            RoundingMode::RoundUp => "Round Up",
            RoundingMode::RoundDown => "Round Down",
        }
    }
}

/// Unrounded invoice figures.
///
/// Per-item mode sums each row's breakdown. Invoice-level mode computes the
/// discount and tax once on the summed base.
pub fn invoice_breakdown(items: &[LineItem], mode: &DiscountMode) -> Breakdown {
    match *mode {
        DiscountMode::PerItem => items
            .iter()
            .map(|i| Breakdown::compute(i.base(), i.discount_percent, i.gst_percent))
            .fold(Breakdown::default(), Breakdown::accumulate),
        DiscountMode::InvoiceLevel { discount_percent, gst_percent } => {
            let subtotal: f64 = items.iter().map(LineItem::base).sum();
            Breakdown::compute(subtotal, discount_percent, gst_percent)
        }
    }
}

/// Grand total, with `rounding` applied after summation.
pub fn invoice_total(items: &[LineItem], mode: &DiscountMode, rounding: RoundingMode) -> f64 {
    rounding.apply(invoice_breakdown(items, mode).amount)
}

/// Two-decimal display form of a currency value.
///
/// Ties round half away from zero on the exact binary value, so `0.125`
/// shows as `0.13` and `-0.125` as `-0.13`.
pub fn format_amount(value: f64) -> String {
    let formatted = match Decimal::from_f64_retain(value) {
        Some(exact) => {
            let mut cents = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            cents.rescale(2);
            cents.to_string()
        }
        None => format!("{:.2}", value),
    };
    // tiny negatives would otherwise print as "-0.00"
    if formatted == "-0.00" { "0.00".to_string() } else { formatted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;

    fn item(quantity: f64, rate: f64, discount: f64, gst: f64) -> LineItem {
        LineItem {
            quantity,
            rate,
            discount_percent: discount,
            gst_percent: gst,
            ..LineItem::new(ItemId(1))
        }
    }

    #[test]
    fn discount_is_taken_before_tax() {
        let b = Breakdown::compute(100.0, 10.0, 18.0);
        assert_eq!(b.base, 100.0);
        assert_eq!(b.discount_amount, 10.0);
        assert_eq!(b.taxable_base, 90.0);
        assert!((b.tax_amount - 16.2).abs() < 1e-9);
        assert!((b.amount - 106.2).abs() < 1e-9);
        assert_eq!(format_amount(b.amount), "106.20");
    }

    #[test]
    fn line_amount_uses_given_rates() {
        let row = item(2.0, 50.0, 0.0, 0.0);
        assert_eq!(line_amount(&row, 0.0, 0.0), 100.0);
        assert!((line_amount(&row, 10.0, 18.0) - 106.2).abs() < 1e-9);
    }

    #[test]
    fn negative_inputs_flow_through() {
        let row = item(-1.0, 10.0, 0.0, 0.0);
        assert_eq!(line_amount(&row, 0.0, 0.0), -10.0);
        // negative discount inflates
        let row = item(1.0, 100.0, -10.0, 0.0);
        assert_eq!(line_amount(&row, -10.0, 0.0), 110.0);
    }

    #[test]
    fn rounding_modes() {
        let rows = vec![item(1.0, 100.0, 10.0, 18.0)];
        let mode = DiscountMode::PerItem;
        assert_eq!(format_amount(invoice_total(&rows, &mode, RoundingMode::None)), "106.20");
        assert_eq!(invoice_total(&rows, &mode, RoundingMode::RoundUp), 107.0);
        assert_eq!(invoice_total(&rows, &mode, RoundingMode::RoundDown), 106.0);
    }

    #[test]
    fn rounding_happens_after_summation() {
        // 0.4 + 0.4 = 0.8 -> ceil 1, whereas per-line ceil would give 2
        let rows = vec![item(1.0, 0.4, 0.0, 0.0), item(1.0, 0.4, 0.0, 0.0)];
        assert_eq!(invoice_total(&rows, &DiscountMode::PerItem, RoundingMode::RoundUp), 1.0);
    }

    #[test]
    fn empty_invoice_is_zero() {
        for rounding in [RoundingMode::None, RoundingMode::RoundUp, RoundingMode::RoundDown] {
            let total = invoice_total(&[], &DiscountMode::PerItem, rounding);
            assert_eq!(format_amount(total), "0.00");
            let mode = DiscountMode::InvoiceLevel { discount_percent: 5.0, gst_percent: 18.0 };
            assert_eq!(format_amount(invoice_total(&[], &mode, rounding)), "0.00");
        }
    }

    #[test]
    fn invoice_level_rates_apply_to_subtotal() {
        let rows = vec![item(2.0, 25.0, 99.0, 99.0), item(1.0, 50.0, 99.0, 99.0)];
        let mode = DiscountMode::InvoiceLevel { discount_percent: 10.0, gst_percent: 18.0 };
        let b = invoice_breakdown(&rows, &mode);
        assert_eq!(b.base, 100.0);
        assert!((b.amount - 106.2).abs() < 1e-9);
    }

    #[test]
    fn per_item_breakdown_sums_rows() {
        let rows = vec![item(1.0, 100.0, 10.0, 0.0), item(1.0, 100.0, 0.0, 5.0)];
        let b = invoice_breakdown(&rows, &DiscountMode::PerItem);
        assert_eq!(b.base, 200.0);
        assert_eq!(b.discount_amount, 10.0);
        assert_eq!(b.taxable_base, 190.0);
        assert_eq!(b.tax_amount, 5.0);
        assert_eq!(b.amount, 195.0);
    }

    #[test]
    fn effective_rates_follow_mode() {
        let row = item(1.0, 1.0, 3.0, 4.0);
        assert_eq!(DiscountMode::PerItem.effective_rates(&row), (3.0, 4.0));
        let mode = DiscountMode::InvoiceLevel { discount_percent: 1.0, gst_percent: 2.0 };
        assert_eq!(mode.effective_rates(&row), (1.0, 2.0));
    }

    #[test]
    fn negative_zero_formats_plainly() {
        assert_eq!(format_amount(-0.0), "0.00");
        assert_eq!(format_amount(-0.001), "0.00");
        assert_eq!(format_amount(-1.5), "-1.50");
    }

    #[test]
    fn exact_ties_round_away_from_zero() {
        assert_eq!(format_amount(0.125), "0.13");
        assert_eq!(format_amount(0.375), "0.38");
        assert_eq!(format_amount(10.125), "10.13");
        assert_eq!(format_amount(-0.125), "-0.13");
        assert_eq!(format_amount(100.0), "100.00");
    }
}
