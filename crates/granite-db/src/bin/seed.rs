//! # Seed Data Generator
//!
//! Populates the database with measurement sheets for development.
//!
//! ## Usage
//! ```bash
//! # 50 sheets with 20 slabs each (default)
//! cargo run -p granite-db --bin seed
//!
//! # Custom amounts
//! cargo run -p granite-db --bin seed -- --sheets 200 --items 40
//!
//! # Specify database path
//! cargo run -p granite-db --bin seed -- --db ./data/ledger.db
//! ```
//!
//! ## Generated Sheets
//! Customer types rotate through all five conventions. Slab dimensions are
//! derived from the loop index, so two runs produce the same measurements:
//! - Length: 60 - 155 inches
//! - Breadth: 36 - 115 inches
//! - Block numbers: `BLK-{sheet}-{n}` on every third slab

use std::env;

use granite_core::validation::validate_line_item;
use granite_core::{strategy_for, CustomerType, LineItemInput, SlabCategory};
use granite_db::{Database, DbConfig, NewLineItem};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sheet_count: usize = 50;
    let mut items_per_sheet: usize = 20;
    let mut db_path = String::from("./granite_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sheets" | "-s" => {
                if i + 1 < args.len() {
                    sheet_count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--items" | "-i" => {
                if i + 1 < args.len() {
                    items_per_sheet = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Granite Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sheets <N>   Number of sheets to generate (default: 50)");
                println!("  -i, --items <N>    Slabs per sheet (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./granite_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Granite Ledger Seed Data Generator");
    println!("=====================================");
    println!("Database: {}", db_path);
    println!("Sheets:   {}", sheet_count);
    println!("Slabs:    {} per sheet", items_per_sheet);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sheets().statistics().await?;
    if existing.total_sheets > 0 {
        println!("⚠ Database already has {} sheets", existing.total_sheets);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating sheets...");

    let start = std::time::Instant::now();
    let mut generated_items = 0;

    for sheet_idx in 0..sheet_count {
        let customer_type = CustomerType::ALL[sheet_idx % CustomerType::ALL.len()];
        let customer_id = format!("CUST-{:03}", sheet_idx % 17 + 1);
        let sheet = db.sheets().create(&customer_id, customer_type).await?;

        let items = (0..items_per_sheet)
            .map(|item_idx| generate_item(customer_type, sheet_idx, item_idx))
            .collect::<Result<Vec<_>, _>>()?;

        match db.line_items().insert_batch(&sheet.id, items).await {
            Ok(stored) => generated_items += stored.len(),
            Err(e) => {
                eprintln!("Failed to fill {}: {}", sheet.sheet_number, e);
                continue;
            }
        }

        // Every fourth sheet is handed over for billing.
        if sheet_idx % 4 == 3 {
            db.sheets().complete(&sheet.id).await?;
        }

        if (sheet_idx + 1) % 10 == 0 {
            println!("  Generated {} sheets...", sheet_idx + 1);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} sheets / {} slabs in {:?}",
        sheet_count, generated_items, elapsed
    );
    println!(
        "  Rate: {:.0} slabs/second",
        generated_items as f64 / elapsed.as_secs_f64()
    );

    let stats = db.sheets().statistics().await?;
    println!();
    println!("Totals:");
    println!("  Draft:      {}", stats.draft_sheets);
    println!("  Completed:  {}", stats.completed_sheets);
    println!("  Area:       {:.2} sq ft", stats.total_area);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one computed slab with deterministic dimensions.
fn generate_item(
    customer_type: CustomerType,
    sheet_idx: usize,
    item_idx: usize,
) -> Result<NewLineItem, Box<dyn std::error::Error>> {
    let seed = sheet_idx * 131 + item_idx * 17;
    let length = 60.0 + (seed % 96) as f64;
    let breadth = 36.0 + ((seed * 7) % 80) as f64;
    let category = SlabCategory::ALL[seed % SlabCategory::ALL.len()];

    let mut input = LineItemInput::new(length, breadth, category);
    if item_idx % 3 == 0 {
        input = input.with_block_number(format!("BLK-{}-{}", sheet_idx + 1, item_idx + 1));
    }

    let validated = validate_line_item(&input)?;
    let result = strategy_for(customer_type).compute(length, breadth)?;
    Ok(NewLineItem::from_calculation(validated, &result))
}
