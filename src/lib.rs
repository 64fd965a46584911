//! Invoice line pricing, GST totals and persistent invoice numbering.

pub mod document;
pub mod error;
pub mod input;
pub mod logging;
pub mod model;
pub mod pricing;
pub mod sequence;
pub mod settings;

pub use error::{Error, Result};
pub use model::{InvoiceMeta, ItemField, ItemId, LineItem, LineItems};
pub use pricing::{DiscountMode, RoundingMode, format_amount, invoice_total, line_amount};
pub use sequence::{KeyValueStore, MemoryStore, SequenceAllocator, TomlFileStore};
