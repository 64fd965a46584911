use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};
use inquire::{Confirm, DateSelect, InquireError, Select, Text};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::error;

use gst_invoice::document::{self, InvoiceDocument, Renderer};
use gst_invoice::error::{Error, Result};
use gst_invoice::input::{parse_item_spec, parse_number_or_zero};
use gst_invoice::model::{InvoiceMeta, Issuer, ItemField, LineItems, PaymentMethod, Recipient};
use gst_invoice::pricing::{DiscountMode, RoundingMode};
use gst_invoice::sequence::{SequenceAllocator, TomlFileStore};
use gst_invoice::settings::{self, AppSettings};
use gst_invoice::logging;

const PER_ITEM_OPT: &str = "Per item (each row has its own discount & GST)";
const INVOICE_LEVEL_OPT: &str = "Invoice level (one discount & GST on the subtotal)";

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "gst-invoice")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new invoice
    New {
        /// Use one discount & GST rate for the whole invoice
        #[arg(long)]
        invoice_level: bool,
    },
    /// Calculate a total without creating an invoice
    Total {
        /// Line item as [name=]qty:rate[:discount[:gst]] (repeatable)
        #[arg(long = "item", required = true)]
        items: Vec<String>,
        /// Invoice-level discount %, applied to the subtotal
        #[arg(long)]
        discount: Option<f64>,
        /// Invoice-level GST %, applied to the subtotal
        #[arg(long)]
        gst: Option<f64>,
        /// Rounding applied to the final total
        #[arg(long, value_enum, default_value_t = RoundingMode::None)]
        round: RoundingMode,
        /// Print the flattened invoice as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last allocated invoice number
    Sequence,
    /// Configure data directory and defaults
    Config,
    /// Open output folder
    Open,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    logging::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        return;
    };

    match run(command) {
        Ok(()) => {}
        Err(Error::Prompt(InquireError::OperationCanceled | InquireError::OperationInterrupted)) => {
            println!("Cancelled");
        }
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::New { invoice_level } => {
            let settings = settings_or_wizard()?;
            new_invoice(&settings, invoice_level)
        }
        Commands::Total { items, discount, gst, round, json } => {
            let settings = settings::load_settings()?.unwrap_or_default();
            quick_total(&settings, &items, discount, gst, round, json)
        }
        Commands::Sequence => {
            let settings = settings_or_wizard()?;
            let allocator = SequenceAllocator::new(TomlFileStore::in_dir(&settings.root()));
            let current = allocator.current();
            if current == 0 {
                println!("No invoices numbered yet. The next one will be 1.");
            } else {
                println!("🧾 Last invoice number: {} (next: {})", current, current + 1);
            }
            Ok(())
        }
        Commands::Config => setup_config_wizard().map(|_| ()),
        Commands::Open => {
            let settings = settings_or_wizard()?;
            open_folder_wizard(&settings.output_dir())
        }
    }
}

// ==========================================
// 1. New Invoice Session
// ==========================================

fn new_invoice(settings: &AppSettings, invoice_level: bool) -> Result<()> {
    let root = settings.root();
    fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;

    // Numbered once, up front. An abandoned session leaves a gap.
    let mut allocator = SequenceAllocator::new(TomlFileStore::in_dir(&root));
    let number = allocator.next_invoice_number();
    println!("🧾 Invoice No: {}", number);

    let date = DateSelect::new("Invoice Date:")
        .with_default(Local::now().date_naive())
        .prompt()?;

    let issuer = edit_issuer(settings::load_issuer(&root)?)?;
    let recipient = enter_recipient()?;

    let per_item = !invoice_level
        && Select::new("Discount & GST:", vec![PER_ITEM_OPT, INVOICE_LEVEL_OPT]).prompt()? == PER_ITEM_OPT;

    let mut items = LineItems::with_default_gst(settings.default_gst_percent);
    enter_invoice_items(&mut items, per_item)?;
    if items.is_empty() {
        println!("❌ No items entered. Aborting.");
        return Ok(());
    }
    remove_items_wizard(&mut items)?;

    let mode = if per_item {
        DiscountMode::PerItem
    } else {
        let discount = Text::new("Discount (%):").with_default("0").prompt()?;
        let gst = Text::new("GST (%):")
            .with_default(&settings.default_gst_percent.to_string())
            .prompt()?;
        DiscountMode::InvoiceLevel {
            discount_percent: parse_number_or_zero(&discount),
            gst_percent: parse_number_or_zero(&gst),
        }
    };

    let unrounded = InvoiceDocument::build(items.as_slice(), mode, RoundingMode::None, None)
        .with_currency(&settings.currency);
    print_preview(&unrounded);

    let rounding = ask_for_rounding()?;
    let meta = InvoiceMeta { number, date, issuer, recipient };
    let doc = InvoiceDocument::build(items.as_slice(), mode, rounding, Some(meta))
        .with_currency(&settings.currency);
    println!("Total ({}): {}", doc.currency, doc.summary.total);

    if !Confirm::new("Download invoice?").with_default(true).prompt()? {
        println!("Invoice {} not saved.", number);
        return Ok(());
    }

    let rendered = Renderer::new(&root)?.render(&doc)?;
    println!("📄 Text copy: {:?}", rendered.txt_path);
    match rendered.pdf_path {
        Some(pdf) => {
            println!("✅ PDF Generated: {:?}", pdf);
            open_and_reveal(&pdf);
        }
        None => println!("⚠️  PDF not produced, typst source kept at {:?}", rendered.typ_path),
    }
    Ok(())
}

// ==========================================
// 2. Data Entry Helpers
// ==========================================

fn edit_issuer(mut issuer: Issuer) -> Result<Issuer> {
    println!("Billed By: {} ({})", issuer.name, issuer.email);
    if !Confirm::new("Edit sender details for this invoice?").with_default(false).prompt()? {
        return Ok(issuer);
    }

    issuer.name = Text::new("Name:").with_default(&issuer.name).prompt()?;
    issuer.address = Text::new("Address:").with_default(&issuer.address).prompt()?;
    issuer.city = Text::new("City:").with_default(&issuer.city).prompt()?;
    issuer.email = Text::new("Email:").with_default(&issuer.email).prompt()?;
    issuer.gst_number = Text::new("GST No:").with_default(&issuer.gst_number).prompt()?;
    issuer.state = Text::new("State:").with_default(&issuer.state).prompt()?;
    Ok(issuer)
}

fn enter_recipient() -> Result<Recipient> {
    println!("\n--- Billed To ---");
    let name = Text::new("Name:").prompt()?;
    let address = Text::new("Address (Optional):").prompt()?;
    let email = Text::new("Email (Optional):").prompt()?;
    let phone = Text::new("Phone No (Optional):").prompt()?;
    let state = Text::new("State (Optional):").prompt()?;
    let pincode = Text::new("Pincode (Optional):").prompt()?;

    let options = vec![PaymentMethod::Unspecified, PaymentMethod::Online, PaymentMethod::Cash];
    let payment_method = Select::new("Payment Method:", options).prompt()?;

    Ok(Recipient { name, address, email, phone, state, pincode, payment_method })
}

fn enter_invoice_items(items: &mut LineItems, per_item: bool) -> Result<()> {
    println!("\n--- Enter Invoice Items ---");
    println!("(Leave Item Name empty to finish)");

    loop {
        let name = Text::new("Item Name (leave empty to finish):").prompt()?;
        if name.trim().is_empty() {
            break;
        }

        let id = items.add_item();
        items.set_field(id, ItemField::Name, &name);

        let description = Text::new("Description (Optional):").prompt()?;
        items.set_field(id, ItemField::Description, &description);

        let quantity = Text::new("Qty:").with_default("1").prompt()?;
        items.set_field(id, ItemField::Quantity, &quantity);

        let rate = Text::new("Rate:").with_default("0").prompt()?;
        items.set_field(id, ItemField::Rate, &rate);

        if per_item {
            let discount = Text::new("Discount (%):").with_default("0").prompt()?;
            items.set_field(id, ItemField::DiscountPercent, &discount);

            let default_gst = items.get(id).map(|i| i.gst_percent.to_string()).unwrap_or_default();
            let gst = Text::new("GST (%):").with_default(&default_gst).prompt()?;
            items.set_field(id, ItemField::GstPercent, &gst);
        }

        if let Some(item) = items.get(id) {
            println!("  ➜ {}", document::entry_line(item, per_item));
        }
    }
    Ok(())
}

fn remove_items_wizard(items: &mut LineItems) -> Result<()> {
    while !items.is_empty() && Confirm::new("Remove an item?").with_default(false).prompt()? {
        let options: Vec<String> = items.iter().map(|i| format!("{} {}", i.id, i.name)).collect();
        let choice = Select::new("Select Item to Remove:", options.clone()).prompt()?;
        let Some(pos) = options.iter().position(|o| *o == choice) else { continue };
        let id = items.as_slice()[pos].id;
        if let Some(removed) = items.remove_item(id) {
            println!("🗑️  Removed {} {}", removed.id, removed.name);
        }
    }
    Ok(())
}

fn ask_for_rounding() -> Result<RoundingMode> {
    let options = vec![RoundingMode::None, RoundingMode::RoundUp, RoundingMode::RoundDown];
    let labels: Vec<&str> = options.iter().map(|r| r.label()).collect();
    let choice = Select::new("Round Total:", labels.clone()).prompt()?;
    let pos = labels.iter().position(|l| *l == choice).unwrap_or(0);
    Ok(options[pos])
}

// ==========================================
// 3. Quick Total
// ==========================================

fn quick_total(
    settings: &AppSettings,
    specs: &[String],
    discount: Option<f64>,
    gst: Option<f64>,
    rounding: RoundingMode,
    json: bool,
) -> Result<()> {
    let mut items = LineItems::with_default_gst(settings.default_gst_percent);
    for spec in specs {
        parse_item_spec(spec, &mut items)?;
    }

    let mode = if discount.is_some() || gst.is_some() {
        DiscountMode::InvoiceLevel {
            discount_percent: discount.unwrap_or(0.0),
            gst_percent: gst.unwrap_or(0.0),
        }
    } else {
        DiscountMode::PerItem
    };

    let doc = InvoiceDocument::build(items.as_slice(), mode, rounding, None).with_currency(&settings.currency);
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_preview(&doc);
    }
    Ok(())
}

fn print_preview(doc: &InvoiceDocument) {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("Item"),
        Cell::new("Description"),
        Cell::new("Qty"),
        Cell::new("Rate"),
        Cell::new("Disc %"),
        Cell::new("GST %"),
        Cell::new("Amount"),
    ]);

    for row in &doc.rows {
        table.add_row(vec![
            Cell::new(row.index),
            Cell::new(&row.name),
            Cell::new(&row.description),
            Cell::new(&row.quantity).set_alignment(CellAlignment::Right),
            Cell::new(&row.rate).set_alignment(CellAlignment::Right),
            Cell::new(&row.discount_percent).set_alignment(CellAlignment::Right),
            Cell::new(&row.gst_percent).set_alignment(CellAlignment::Right),
            Cell::new(&row.amount).set_alignment(CellAlignment::Right),
        ]);
    }

    let summary_row = |label: String, value: &str, bold: bool| {
        let mut label_cell = Cell::new(label);
        let mut value_cell = Cell::new(value).set_alignment(CellAlignment::Right);
        if bold {
            label_cell = label_cell.add_attribute(Attribute::Bold);
            value_cell = value_cell.add_attribute(Attribute::Bold).fg(Color::Rgb { r: 4, g: 120, b: 87 });
        }
        let mut row = vec![Cell::new(""); 6];
        row.push(label_cell);
        row.push(value_cell);
        row
    };

    table.add_row(summary_row("Subtotal".into(), doc.summary.subtotal.as_str(), false));
    table.add_row(summary_row("Discount".into(), doc.summary.discount.as_str(), false));
    table.add_row(summary_row("GST".into(), doc.summary.tax.as_str(), false));
    if doc.summary.rounding != RoundingMode::None {
        table.add_row(summary_row("Rounding".into(), doc.summary.rounding_label, false));
    }
    table.add_row(summary_row(format!("Total ({})", doc.currency), doc.summary.total.as_str(), true));

    println!("\n--- Invoice Preview ---");
    println!("{table}");
}

// ==========================================
// 4. Open Folder Logic
// ==========================================

fn open_folder_wizard(output_root: &Path) -> Result<()> {
    let root_opt = "📂 Open Root Output Directory".to_string();
    let mut years = Vec::new();

    if let Ok(entries) = fs::read_dir(output_root) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                years.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    years.sort();
    years.reverse();

    let mut options = vec![root_opt.clone()];
    options.extend(years);

    let choice = Select::new("Select Folder to Open:", options).prompt()?;
    let target_path = if choice == root_opt { output_root.to_path_buf() } else { output_root.join(choice) };
    fs::create_dir_all(&target_path).map_err(|e| Error::io(&target_path, e))?;
    println!("🚀 Opening: {:?}", target_path);
    open_path(&target_path);
    Ok(())
}

fn open_path(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(path).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}

// Helper: Open file and reveal in Finder/Explorer
fn open_and_reveal(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg("-R").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(format!("/select,{}", path.to_string_lossy())).spawn().ok();

    open_path(path);
}

// ==========================================
// 5. Config
// ==========================================

fn settings_or_wizard() -> Result<AppSettings> {
    match settings::load_settings()? {
        Some(s) => Ok(s),
        None => setup_config_wizard(),
    }
}

fn setup_config_wizard() -> Result<AppSettings> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = settings::load_settings()?.unwrap_or_default();

    println!("📂 Opening folder picker...");
    let picked_path: Option<PathBuf> = rfd::FileDialog::new()
        .set_title("Select Root Data Directory")
        .pick_folder();

    let data_root = match picked_path {
        Some(path) => path.to_string_lossy().to_string(),
        None => {
            println!("❌ No folder selected. Falling back to manual input.");
            Text::new("Enter Root Data Directory:").with_default(&current.data_root).prompt()?
        }
    };

    let gst = Text::new("Default GST % for new items:")
        .with_default(&current.default_gst_percent.to_string())
        .prompt()?;
    let currency = Text::new("Currency label:").with_default(&current.currency).prompt()?;

    let settings = AppSettings {
        data_root,
        default_gst_percent: parse_number_or_zero(&gst),
        currency,
    };
    settings::save_settings(&settings)?;
    println!("✅ Settings saved.");
    Ok(settings)
}
