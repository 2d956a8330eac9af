//! # Tally CLI
//!
//! Read-only front end over a configured store.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed -- --db ./tally_dev.db
//! TALLY_STORE_BACKEND=sqlite TALLY_DB_PATH=./tally_dev.db \
//!     cargo run -p tally-service --bin tally -- campaigns
//!
//! cargo run -p tally-service --bin tally -- quote <RECEIPT_ID>
//! cargo run -p tally-service --bin tally -- --config ./tally.toml report
//! ```

use std::env;
use std::path::PathBuf;

use serde::Serialize;
use tally_service::{telemetry, Tally, TallyConfig};

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_help() {
    println!("Tally POS");
    println!();
    println!("Usage: tally [OPTIONS] <COMMAND> [ARG]");
    println!();
    println!("Commands:");
    println!("  config               Show the effective configuration");
    println!("  products             List products");
    println!("  campaigns            List campaigns");
    println!("  quote <RECEIPT_ID>   Price a receipt without closing it");
    println!("  x-report <SHIFT_ID>  Report for an open shift");
    println!("  report               Lifetime sales report");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Config file (default: platform config dir)");
    println!("  -h, --help           Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let config = TallyConfig::load(config_path)?;

    let command = positional.first().map(String::as_str).unwrap_or("help");
    let argument = positional.get(1).map(String::as_str);

    if command == "config" {
        let mut shown = config.clone();
        if shown.exchange_rate.api_key.is_some() {
            shown.exchange_rate.api_key = Some("********".to_string());
        }
        println!("{}", toml::to_string_pretty(&shown)?);
        return Ok(());
    }

    let tally = Tally::from_config(&config).await?;

    match (command, argument) {
        ("products", _) => print_json(&tally.products.list().await?)?,
        ("campaigns", _) => print_json(&tally.campaigns.list().await?)?,
        ("quote", Some(receipt_id)) => {
            let payment = tally.payments.calculate_payment(receipt_id).await?;
            print_json(&payment.lines)?;
            print_json(&payment.summary())?;
        }
        ("x-report", Some(shift_id)) => print_json(&tally.shifts.x_report(shift_id).await?)?,
        ("report", _) => print_json(&tally.shifts.sales_report().await?)?,
        _ => print_help(),
    }

    Ok(())
}
