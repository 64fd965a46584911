//! Flattened invoice for printing, and the typst renderer that consumes it.

use chrono::{Datelike, Local};
use serde::Serialize;
use slug::slugify;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tera::{Context, Tera, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{InvoiceMeta, LineItem, PaymentMethod};
use crate::pricing::{self, Breakdown, DiscountMode, RoundingMode, format_amount};

// Embedded so a fresh data root always has a template to start from.
const DEFAULT_TEMPLATE: &str = include_str!("../templates/invoice.tera");
const TEMPLATE_NAME: &str = "invoice.tera";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentRow {
    pub index: usize,
    pub name: String,
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub discount_percent: String,
    pub gst_percent: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentSummary {
    pub subtotal: String,
    pub discount: String,
    pub tax: String,
    pub rounding: RoundingMode,
    pub rounding_label: &'static str,
    pub total: String,
}

/// Everything the printed invoice shows, already formatted as text.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub meta: Option<InvoiceMeta>,
    pub mode: DiscountMode,
    pub currency: String,
    pub rows: Vec<DocumentRow>,
    pub summary: DocumentSummary,
}

impl InvoiceDocument {
    pub fn build(
        items: &[LineItem],
        mode: DiscountMode,
        rounding: RoundingMode,
        meta: Option<InvoiceMeta>,
    ) -> Self {
        let rows = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let (discount, gst) = mode.effective_rates(item);
                DocumentRow {
                    index: i + 1,
                    name: item.name.clone(),
                    description: item.description.clone(),
                    quantity: item.quantity.to_string(),
                    rate: item.rate.to_string(),
                    discount_percent: discount.to_string(),
                    gst_percent: gst.to_string(),
                    amount: format_amount(pricing::line_amount(item, discount, gst)),
                }
            })
            .collect();

        let Breakdown { base, discount_amount, tax_amount, amount, .. } =
            pricing::invoice_breakdown(items, &mode);
        let summary = DocumentSummary {
            subtotal: format_amount(base),
            discount: format_amount(discount_amount),
            tax: format_amount(tax_amount),
            rounding,
            rounding_label: rounding.label(),
            total: format_amount(rounding.apply(amount)),
        };

        Self { meta, mode, currency: "INR".to_string(), rows, summary }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// One line of text per printed line, top to bottom.
    pub fn to_plain_lines(&self) -> Vec<String> {
        let mut lines = vec!["Invoice".to_string()];

        if let Some(meta) = &self.meta {
            lines.push(format!("Invoice No: {}", meta.number));
            lines.push(format!("Invoice Date: {}", meta.date.format("%Y-%m-%d")));
            lines.push(format!("Billed By: {}", identity_line(&[
                &meta.issuer.name,
                &meta.issuer.address,
                &meta.issuer.city,
                &meta.issuer.state,
                &meta.issuer.email,
            ])));
            if !meta.issuer.gst_number.is_empty() {
                lines.push(format!("GST No: {}", meta.issuer.gst_number));
            }
            lines.push(format!("Billed To: {}", identity_line(&[
                &meta.recipient.name,
                &meta.recipient.address,
                &meta.recipient.state,
                &meta.recipient.pincode,
                &meta.recipient.email,
                &meta.recipient.phone,
            ])));
            if meta.recipient.payment_method != PaymentMethod::Unspecified {
                lines.push(format!("Payment Method: {}", meta.recipient.payment_method));
            }
        }

        for row in &self.rows {
            let label = if row.description.is_empty() {
                row.name.clone()
            } else {
                format!("{} - {}", row.name, row.description)
            };
            lines.push(format!(
                "Item {}: {}, Qty: {}, Rate: {}, Discount: {}%, GST: {}%, Amount: {}",
                row.index, label, row.quantity, row.rate, row.discount_percent, row.gst_percent, row.amount
            ));
        }

        lines.push(format!("Subtotal: {}", self.summary.subtotal));
        lines.push(format!("Discount: {}", self.summary.discount));
        lines.push(format!("GST: {}", self.summary.tax));
        if self.summary.rounding != RoundingMode::None {
            lines.push(format!("Rounding: {}", self.summary.rounding_label));
        }
        lines.push(format!("Total: {}", self.summary.total));
        lines
    }

    /// Base name for output files, e.g. `INV-0007_acme-traders`.
    pub fn file_stem(&self) -> String {
        match &self.meta {
            Some(meta) => {
                let slug = slugify(&meta.recipient.name);
                let slug = if slug.is_empty() { "invoice".to_string() } else { slug };
                format!("INV-{:04}_{}", meta.number, slug)
            }
            None => "invoice".to_string(),
        }
    }
}

/// Echo printed right after a row is entered. Invoice-level rates are not
/// known yet at that point, so only the row's base is shown.
pub fn entry_line(item: &LineItem, per_item: bool) -> String {
    if per_item {
        let amount = pricing::line_amount(item, item.discount_percent, item.gst_percent);
        format!("{} {}: {}", item.id, item.name, format_amount(amount))
    } else {
        format!(
            "{} {}: {} before invoice discount and GST",
            item.id,
            item.name,
            format_amount(item.base())
        )
    }
}

fn identity_line(parts: &[&String]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Files written for one invoice.
#[derive(Debug, Clone)]
pub struct RenderedInvoice {
    pub typ_path: PathBuf,
    pub txt_path: PathBuf,
    /// Set only when `typst` produced a PDF.
    pub pdf_path: Option<PathBuf>,
}

/// Writes an `InvoiceDocument` as typst source plus a plain text copy, then
/// asks the `typst` CLI for a PDF.
pub struct Renderer {
    tera: Tera,
    output_root: PathBuf,
    compile_pdf: bool,
}

impl Renderer {
    /// Loads `<root>/templates/*.tera`, seeding the bundled template on first
    /// use so users can customise it in place.
    pub fn new(root: &Path) -> Result<Self> {
        let template_dir = root.join("templates");
        fs::create_dir_all(&template_dir).map_err(|e| Error::io(&template_dir, e))?;
        let template_path = template_dir.join(TEMPLATE_NAME);
        if !template_path.exists() {
            println!("✨ Initializing default template...");
            fs::write(&template_path, DEFAULT_TEMPLATE).map_err(|e| Error::io(&template_path, e))?;
        }

        let mut tera = Tera::new(&template_dir.join("*.tera").to_string_lossy())?;
        tera.register_filter("typst", typst_escape);

        Ok(Self { tera, output_root: root.join("output"), compile_pdf: true })
    }

    /// Skip the `typst compile` step.
    pub fn without_pdf(mut self) -> Self {
        self.compile_pdf = false;
        self
    }

    pub fn render_source(&self, doc: &InvoiceDocument) -> Result<String> {
        let context = Context::from_serialize(doc)?;
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    pub fn render(&self, doc: &InvoiceDocument) -> Result<RenderedInvoice> {
        let year = doc
            .meta
            .as_ref()
            .map(|m| m.date.year())
            .unwrap_or_else(|| Local::now().year());
        let output_dir = self.output_root.join(year.to_string());
        fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;

        let stem = doc.file_stem();
        let typ_path = output_dir.join(format!("{stem}.typ"));
        let txt_path = output_dir.join(format!("{stem}.txt"));
        let pdf_path = output_dir.join(format!("{stem}.pdf"));

        let source = self.render_source(doc)?;
        fs::write(&typ_path, source).map_err(|e| Error::io(&typ_path, e))?;
        let mut text = doc.to_plain_lines().join("\n");
        text.push('\n');
        fs::write(&txt_path, text).map_err(|e| Error::io(&txt_path, e))?;
        info!(path = %typ_path.display(), "invoice source written");

        let pdf_path = if self.compile_pdf { compile_typst(&typ_path, &pdf_path) } else { None };
        Ok(RenderedInvoice { typ_path, txt_path, pdf_path })
    }
}

fn compile_typst(typ_path: &Path, pdf_path: &Path) -> Option<PathBuf> {
    if Command::new("typst").arg("--version").output().is_err() {
        warn!("typst not found on PATH, skipping PDF");
        println!("❌ 'typst' is not installed, PDF skipped (install it to get PDFs).");
        return None;
    }

    println!("\n🔨 Compiling PDF...");
    match Command::new("typst").arg("compile").arg(typ_path).arg(pdf_path).status() {
        Ok(s) if s.success() => Some(pdf_path.to_path_buf()),
        Ok(s) => {
            warn!(status = %s, "typst compile failed");
            None
        }
        Err(e) => {
            warn!(error = %e, "could not run typst");
            None
        }
    }
}

/// Escape a value for use inside a typst string literal.
fn typst_escape(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    Ok(Value::String(escaped))
}
