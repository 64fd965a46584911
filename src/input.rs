//! Parse-or-default coercion for free-text form input.
//!
//! The pricing engine only ever sees numbers; this is where text typed into a
//! quantity/rate/percentage field becomes one.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{ItemField, ItemId, LineItems};

static DECIMAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)").expect("valid decimal regex")
});

static INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("valid integer regex"));

/// Parse the leading decimal literal of `raw`, or 0 when there is none.
///
/// Trailing junk is ignored (`"12abc"` is 12). Non-finite results are 0.
pub fn parse_number_or_zero(raw: &str) -> f64 {
    DECIMAL_PREFIX
        .captures(raw)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse the leading unsigned integer of a stored counter value.
///
/// Negative or overflowing values count as absent.
pub fn parse_counter(raw: &str) -> Option<u64> {
    let caps = INTEGER_PREFIX.captures(raw)?;
    if &caps[1] == "-" {
        return None;
    }
    caps[2].parse().ok()
}

/// Add a row described as `[name=]qty:rate[:discount[:gst]]`.
///
/// Unlike form input this is strict: every numeric part must parse.
/// Omitted percentages keep the collection defaults.
pub fn parse_item_spec(spec: &str, items: &mut LineItems) -> Result<ItemId> {
    let invalid = |reason| Error::ItemSpec { spec: spec.to_string(), reason };

    let (name, numbers) = match spec.split_once('=') {
        Some((name, rest)) => (name.trim(), rest),
        None => ("", spec),
    };
    let parts: Vec<&str> = numbers.split(':').map(str::trim).collect();
    if !(2..=4).contains(&parts.len()) {
        return Err(invalid("expected qty:rate[:discount[:gst]]"));
    }
    if parts.iter().any(|p| p.parse::<f64>().map(|v| !v.is_finite()).unwrap_or(true)) {
        return Err(invalid("not a number"));
    }

    let fields = [ItemField::Quantity, ItemField::Rate, ItemField::DiscountPercent, ItemField::GstPercent];
    let id = items.add_item();
    items.set_field(id, ItemField::Name, name);
    for (field, raw) in fields.into_iter().zip(parts) {
        items.set_field(id, field, raw);
    }
    Ok(id)
}
