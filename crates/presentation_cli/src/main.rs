//! belegbot CLI
//!
//! Command-line interface for administration and local development.

#![allow(clippy::print_stdout)]

use std::sync::Arc;

use anyhow::Context as _;
use application::ports::{ReceiptStore, UserStore};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use domain::{Amount, PhoneNumber, Receipt};
use infrastructure::{DatabaseConfig, SqliteReceiptStore, SqliteUserStore, create_pool};
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// belegbot CLI
#[derive(Parser)]
#[command(name = "belegbot-cli")]
#[command(author, version, about = "belegbot receipt service CLI", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status
    Status {
        /// Server URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
    },

    /// Seed fake receipts for a user (development only)
    Seed {
        /// Phone number of the account to seed (created if absent)
        #[arg(short, long)]
        phone: String,

        /// Number of receipts to create
        #[arg(short, long, default_value_t = 20)]
        count: u32,

        /// Path to the SQLite database
        #[arg(short, long, default_value = "belegbot.db")]
        database: String,
    },
}

/// Example vendors for seeded receipts
const VENDORS: &[&str] = &[
    "REWE",
    "Aldi Süd",
    "Edeka",
    "dm-drogerie markt",
    "Lidl",
    "Rossmann",
    "Obi Baumarkt",
    "Shell Tankstelle",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Status { url } => status(&url).await,
        Commands::Seed {
            phone,
            count,
            database,
        } => seed(&phone, count, &database).await,
    }
}

/// Query the server health endpoint
async fn status(url: &str) -> anyhow::Result<()> {
    let response = reqwest::get(format!("{url}/health"))
        .await
        .context("server unreachable")?;
    let status = response.status();
    let body: serde_json::Value = response.json().await.context("invalid health response")?;

    println!("Server: {url}");
    println!("HTTP status: {status}");
    println!("Version: {}", body["version"].as_str().unwrap_or("?"));

    let ready = reqwest::get(format!("{url}/ready"))
        .await
        .context("readiness unreachable")?;
    let ready_body: serde_json::Value = ready.json().await.unwrap_or_default();
    println!(
        "Ready: {} (database: {}, inference: {})",
        ready_body["ready"], ready_body["database"], ready_body["inference"]
    );

    Ok(())
}

/// Create fake receipts for a user
async fn seed(phone: &str, count: u32, database: &str) -> anyhow::Result<()> {
    let phone = PhoneNumber::new(phone).map_err(|e| anyhow::anyhow!("{e}"))?;

    let pool = Arc::new(create_pool(&DatabaseConfig {
        path: database.to_string(),
        ..Default::default()
    })?);

    let users = SqliteUserStore::new(Arc::clone(&pool));
    let receipts = SqliteReceiptStore::new(pool);

    let user = users
        .get_or_create(&phone)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let today = Utc::now().date_naive();
    let mut rng = rand::rng();

    for _ in 0..count {
        let days_back = rng.random_range(0..365);
        let date = today - Duration::days(days_back);
        let vendor = VENDORS[rng.random_range(0..VENDORS.len())];
        // Random amount between 0.10 and 50.00
        let cents = rng.random_range(10..=5000);
        let amount = Amount::from_cents(cents).map_err(|e| anyhow::anyhow!("{e}"))?;

        let receipt = Receipt::new(user.id(), Some(date), vendor, amount);
        receipts
            .save(&receipt)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    println!("{count} fake receipts created for {phone}");
    Ok(())
}
