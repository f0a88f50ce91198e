//! # Seed Data Generator
//!
//! Populates a database with a demo business and its catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path and business id
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db --business demo-shop
//!
//! # More logging
//! RUST_LOG=tally_db=debug cargo run -p tally-db --bin seed
//! ```
//!
//! ## Generated Data
//! - One business (country NG)
//! - A company and an individual customer
//! - Products across tax categories, two of them stock-tracked
//! - Services, one without a category (falls back to SERVICES)

use chrono::Utc;
use std::env;
use tally_core::{new_id, Customer, CustomerClass, InventoryItem, Product, Service};
use tally_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (sku, name, price cents, tax category, track inventory, stock on hand)
const PRODUCTS: &[(&str, &str, i64, Option<&str>, bool, i64)] = &[
    ("RICE-5KG", "Rice 5kg", 8500, Some("REDUCED_FOOD"), true, 40),
    ("OIL-1L", "Vegetable Oil 1L", 2200, Some("REDUCED_FOOD"), false, 0),
    ("TV-43", "43\" Television", 245000, Some("ELECTRONICS"), true, 6),
    ("WINE-750", "Red Wine 750ml", 9900, Some("ALCOHOL"), false, 0),
    ("PEN-BLU", "Ballpoint Pen", 150, None, false, 0),
];

/// (name, rate cents, tax category)
const SERVICES: &[(&str, i64, Option<&str>)] = &[
    ("Installation", 15000, Some("LABOUR")),
    ("Delivery", 3000, None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");
    let mut business_id = String::from("demo-shop");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--business" | "-b" => {
                if i + 1 < args.len() {
                    business_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./tally_dev.db)");
                println!("  -b, --business <ID>    Business id (default: demo-shop)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, business = %business_id, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let catalog = db.catalog();

    if catalog.get_business(&business_id).await?.is_some() {
        info!(business = %business_id, "Business already seeded, skipping");
        return Ok(());
    }

    catalog
        .insert_business(&business_id, "Demo Shop", Some("NG"))
        .await?;

    let now = Utc::now();
    for (name, class) in [
        ("Acme Industries Ltd", CustomerClass::Company),
        ("Ada Obi", CustomerClass::Individual),
    ] {
        catalog
            .insert_customer(&Customer {
                id: new_id(),
                business_id: business_id.clone(),
                name: name.to_string(),
                customer_class: class,
                created_at: now,
            })
            .await?;
    }

    for (sku, name, price, category, tracked, stock) in PRODUCTS {
        let product = Product {
            id: new_id(),
            business_id: business_id.clone(),
            sku: sku.to_string(),
            name: name.to_string(),
            unit_price_cents: *price,
            tax_category_code: category.map(str::to_string),
            track_inventory: *tracked,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        catalog.insert_product(&product).await?;

        if *tracked {
            db.inventory()
                .insert_item(&InventoryItem {
                    id: new_id(),
                    business_id: business_id.clone(),
                    product_id: Some(product.id.clone()),
                    name: product.name.clone(),
                    quantity_on_hand: *stock,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
        }
    }

    for (name, rate, category) in SERVICES {
        catalog
            .insert_service(&Service {
                id: new_id(),
                business_id: business_id.clone(),
                name: name.to_string(),
                rate_cents: *rate,
                tax_category_code: category.map(str::to_string),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    info!(
        products = PRODUCTS.len(),
        services = SERVICES.len(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
