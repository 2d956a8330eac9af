//! # Seed Data Generator
//!
//! Populates a database with a small demo catalog and one campaign of each
//! kind, for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```

use std::env;

use tally_core::{Campaign, CampaignKind, DiscountPercent, Money, Product};
use tally_db::{CampaignStore, Database, DbConfig, ProductStore};

/// Name, price in tetri, barcode.
const PRODUCTS: &[(&str, i64, &str)] = &[
    ("Nabeghlavi 0.5L", 150, "4860019000017"),
    ("Borjomi 0.5L", 250, "4860019000024"),
    ("Shoti Bread", 120, "4860019000031"),
    ("Sulguni 500g", 1290, "4860019000048"),
    ("Churchkhela", 400, "4860019000055"),
    ("Tklapi Plum", 300, "4860019000062"),
    ("Khachapuri", 850, "4860019000079"),
    ("Saperavi 0.75L", 2450, "4860019000086"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally POS Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (name, price, barcode) in PRODUCTS {
        let product = Product::new(*name, Money::from_minor(*price), *barcode);
        db.insert_product(&product).await?;
        products.push(product);
    }
    println!("✓ Inserted {} products", products.len());

    let kinds = vec![
        CampaignKind::Discount {
            product_id: products[3].id.clone(),
            percent_off: DiscountPercent::new(15)?,
        },
        CampaignKind::BuyNGetN {
            product_id: products[0].id.clone(),
            buy_quantity: 2,
            get_quantity: 1,
        },
        CampaignKind::Combo {
            product_ids: vec![products[6].id.clone(), products[1].id.clone()],
            percent_off: DiscountPercent::new(10)?,
        },
        CampaignKind::ReceiptDiscount {
            min_amount: Money::from_minor(5000),
            percent_off: DiscountPercent::new(5)?,
        },
    ];

    for kind in kinds {
        let campaign = Campaign::new(kind)?;
        let links = campaign.links(&products);
        db.insert_campaign(&campaign, &links).await?;
        println!("  + {} campaign {}", campaign.kind.name(), campaign.id);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
