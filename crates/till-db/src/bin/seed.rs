//! # Demo Catalogue Seeder
//!
//! Fills a database with a demo catalogue for trying out the till.
//!
//! ## Usage
//! ```bash
//! # 200 products (default) into ./till_dev.db
//! cargo run -p till-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p till-db --bin seed -- --count 1000 --db ./data/till.db
//! ```
//!
//! Each product gets:
//! - SKU `{CAT}-{ABC}-{NNN}`
//! - Selling price 1.99 - 9.99 plus a size surcharge
//! - Purchase price 60-80% of the selling price
//! - Stock 0 - 60, restock threshold 5 or 10

use futures_util::StreamExt;
use std::env;
use till_core::{InventoryReason, Money, NewProduct};
use till_db::{Database, DbConfig};

/// (SKU prefix, category name, product names)
const CATALOGUE: &[(&str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        &[
            "Cola",
            "Lemon Soda",
            "Orange Soda",
            "Sparkling Water",
            "Still Water",
            "Energy Drink",
            "Orange Juice",
            "Apple Juice",
            "Iced Tea",
            "Cold Brew Coffee",
        ],
    ),
    (
        "SNK",
        "Snacks",
        &[
            "Salted Crisps",
            "Paprika Crisps",
            "Tortilla Chips",
            "Pretzels",
            "Salted Peanuts",
            "Milk Chocolate",
            "Dark Chocolate",
            "Gummy Bears",
            "Oat Cookies",
            "Granola Bar",
        ],
    ),
    (
        "DRY",
        "Dairy",
        &[
            "Whole Milk",
            "Skim Milk",
            "Oat Milk",
            "Cheddar",
            "Mozzarella",
            "Butter",
            "Greek Yogurt",
            "Cream Cheese",
            "Eggs Dozen",
            "Sour Cream",
        ],
    ),
    (
        "GRO",
        "Grocery",
        &[
            "White Bread",
            "Spaghetti",
            "Penne",
            "Long Grain Rice",
            "Canned Beans",
            "Canned Tomatoes",
            "Rolled Oats",
            "Peanut Butter",
            "Honey",
            "Flour",
        ],
    ),
];

/// Size variants and their price surcharge in cents.
const SIZES: &[(&str, i64)] = &[("Small", 0), ("Regular", 60), ("Large", 150), ("Family", 300)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Till POS demo catalogue seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Till POS demo catalogue seeder");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products; nothing to do.", existing);
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (category_idx, (prefix, category, names)) in CATALOGUE.iter().enumerate() {
        for (product_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, surcharge)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + product_idx * 10 + size_idx;
                let product = demo_product(prefix, category, name, size, *surcharge, seed);

                if let Err(e) = db.products().insert(&product, InventoryReason::Import).await {
                    eprintln!("Failed to insert {}: {}", product.sku, e);
                    continue;
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  {} products...", generated);
                }
            }
        }
    }

    println!();
    println!("Generated {} products in {:?}", generated, start.elapsed());

    let matches = db.products().search("cola").count().await;
    println!("Search 'cola': {} results", matches);

    db.close().await;
    Ok(())
}

/// Builds one deterministic demo product.
fn demo_product(
    prefix: &str,
    category: &str,
    name: &str,
    size: &str,
    surcharge: i64,
    seed: usize,
) -> NewProduct {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:03}", prefix, letters, seed % 1000);

    let selling = 199 + ((seed * 17) % 800) as i64 + surcharge;
    let cost_pct = 60 + (seed % 21) as i64;
    let purchase = selling * cost_pct / 100;

    NewProduct::new(
        format!("{} {}", name, size),
        sku,
        Money::from_cents(purchase),
        Money::from_cents(selling),
    )
    .with_stock((seed % 61) as i64)
    .with_min_stock(if seed % 2 == 0 { 5 } else { 10 })
    .with_category(category)
}
