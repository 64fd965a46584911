use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::input::parse_number_or_zero;

/// Row identifier, unique within the `LineItems` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
    pub discount_percent: f64,
    pub gst_percent: f64,
}

impl LineItem {
    /// A fresh row: one unit, every money and percentage field at zero.
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            quantity: 1.0,
            rate: 0.0,
            discount_percent: 0.0,
            gst_percent: 0.0,
        }
    }

    /// Quantity times rate, before any discount or tax.
    pub fn base(&self) -> f64 {
        self.quantity * self.rate
    }
}

/// Editable columns of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Description,
    Quantity,
    Rate,
    DiscountPercent,
    GstPercent,
}

/// Ordered invoice rows.
///
/// Ids come from a counter that only moves forward, so an id that was
/// removed is never handed out again by the same collection.
#[derive(Debug, Clone, Default)]
pub struct LineItems {
    items: Vec<LineItem>,
    next_id: u64,
    default_gst_percent: f64,
}

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows added afterwards start with this GST rate instead of 0.
    pub fn with_default_gst(default_gst_percent: f64) -> Self {
        Self { default_gst_percent, ..Self::default() }
    }

    pub fn add_item(&mut self) -> ItemId {
        self.next_id += 1;
        let id = ItemId(self.next_id);
        let mut item = LineItem::new(id);
        item.gst_percent = self.default_gst_percent;
        self.items.push(item);
        id
    }

    pub fn remove_item(&mut self, id: ItemId) -> Option<LineItem> {
        let pos = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Apply one field edit. Numeric columns are coerced, so malformed text
    /// lands as 0. Returns false when no row has `id`.
    pub fn set_field(&mut self, id: ItemId, field: ItemField, raw: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        match field {
            ItemField::Name => item.name = raw.to_string(),
            ItemField::Description => item.description = raw.to_string(),
            ItemField::Quantity => item.quantity = parse_number_or_zero(raw),
            ItemField::Rate => item.rate = parse_number_or_zero(raw),
            ItemField::DiscountPercent => item.discount_percent = parse_number_or_zero(raw),
            ItemField::GstPercent => item.gst_percent = parse_number_or_zero(raw),
        }
        true
    }

    pub fn get(&self, id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ==========================================
// Invoice metadata (billed by / billed to)
// ==========================================

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Issuer {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub gst_number: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentMethod {
    #[default]
    Unspecified,
    Online,
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Unspecified => "Not specified",
            PaymentMethod::Online => "Online",
            PaymentMethod::Cash => "Cash",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Recipient {
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub state: String,
    pub pincode: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InvoiceMeta {
    pub number: u64,
    pub date: NaiveDate,
    pub issuer: Issuer,
    pub recipient: Recipient,
}
