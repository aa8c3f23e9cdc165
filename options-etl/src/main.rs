//! Options chain ETL
//!
//! Fetches options chains, prices every contract with Black-Scholes and
//! appends the results to SQLite.
//!
//! # Usage
//!
//! ```bash
//! # Price and store every listed contract for AAPL
//! options-etl ingest --symbol AAPL
//!
//! # Pin the evaluation instant and override the rate
//! options-etl ingest --symbol AAPL --as-of 2024-06-03T20:00:00Z --rate 0.045
//!
//! # Show available expirations and the nearest chain
//! options-etl explore --symbol NVDA
//!
//! # Price a single contract
//! options-etl price --spot 100 --strike 100 --time 1 --vol 0.2 --side call
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use options_etl::data::{ContractRecord, MarketDataProvider, YahooClient};
use options_etl::{AppConfig, BlackScholes, Ingestor, SqliteStore};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "options-etl")]
#[command(about = "Fetch options chains, price them with Black-Scholes, and store the results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, price and store every contract for a symbol
    Ingest {
        /// Underlying ticker
        #[arg(short, long)]
        symbol: String,

        /// SQLite database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Risk-free rate (overrides config)
        #[arg(long)]
        rate: Option<f64>,

        /// Evaluation instant, RFC 3339 (defaults to now)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// List expirations and print the nearest chain
    Explore {
        /// Underlying ticker
        #[arg(short, long, default_value = "NVDA")]
        symbol: String,
    },

    /// Price a single contract
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Time to maturity in years
        #[arg(long)]
        time: f64,

        /// Annualized volatility
        #[arg(long)]
        vol: f64,

        /// call or put
        #[arg(long)]
        side: String,

        /// Risk-free rate (overrides config)
        #[arg(long)]
        rate: Option<f64>,
    },
}

async fn cmd_ingest(
    config: AppConfig,
    symbol: String,
    db: Option<PathBuf>,
    rate: Option<f64>,
    as_of: Option<String>,
) -> Result<()> {
    let config = config
        .with_overrides(rate, db)
        .context("invalid command-line override")?;
    let db_path = config.database.path.clone();
    let rate = config.pricing.risk_free_rate;
    let as_of = match as_of {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .context("Invalid --as-of timestamp, expected RFC 3339")?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    let client = YahooClient::new(&config.provider).context("building HTTP client")?;

    let mut ingestor = Ingestor::new(client, store, BlackScholes::new(rate));
    let report = ingestor.run_at(&symbol, as_of).await?;

    println!("{}", SEPARATOR);
    println!("{}", report.summary());
    println!("  Database: {}", db_path.display());
    println!("  Risk-free rate: {}", report.risk_free_rate);
    println!("  Requests made: {}", ingestor.provider().request_count());
    if !report.failed.is_empty() {
        println!("\n  Failed inserts:");
        for failure in &report.failed {
            println!("    {} ({}): {}", failure.contract_symbol, failure.strike, failure.error);
        }
    }
    println!("{}", SEPARATOR);

    Ok(())
}

fn print_contracts(title: &str, contracts: &[ContractRecord]) {
    println!("\n{} ({}):", title, contracts.len());
    println!("  {:<24} {:>10} {:>10} {:>10}", "contract", "strike", "last", "iv");
    for c in contracts {
        println!(
            "  {:<24} {:>10.2} {:>10} {:>10}",
            c.contract_symbol,
            c.strike,
            c.last_price.map(|p| format!("{:.2}", p)).unwrap_or("-".into()),
            c.implied_volatility
                .map(|v| format!("{:.4}", v))
                .unwrap_or("-".into())
        );
    }
}

async fn cmd_explore(config: AppConfig, symbol: String) -> Result<()> {
    let symbol = symbol.trim().to_uppercase();
    let mut client = YahooClient::new(&config.provider).context("building HTTP client")?;

    let expirations = client
        .expirations(&symbol)
        .await
        .with_context(|| format!("fetching expirations for {}", symbol))?;

    println!("{}", SEPARATOR);
    println!("{} options", symbol);
    println!("{}", SEPARATOR);
    println!(
        "Available expiration dates: {}",
        expirations
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let Some(&nearest) = expirations.first() else {
        println!("No options data available for this stock.");
        return Ok(());
    };

    println!("\nFetching options for expiration date: {}", nearest);
    let chain = client
        .chain(&symbol, nearest)
        .await
        .with_context(|| format!("fetching {} chain for {}", nearest, symbol))?;

    if let Some(price) = chain.underlying_price {
        println!("Underlying price: {:.2}", price);
    }
    print_contracts("CALL OPTIONS", &chain.calls);
    print_contracts("PUT OPTIONS", &chain.puts);

    Ok(())
}

fn cmd_price(
    config: AppConfig,
    spot: f64,
    strike: f64,
    time: f64,
    vol: f64,
    side: String,
    rate: Option<f64>,
) -> Result<()> {
    let inputs = options_etl::pricing::PricingInputs {
        spot: Some(spot),
        strike,
        time_to_maturity: time,
        volatility: Some(vol),
    }
    .check()
    .context("inputs cannot be priced")?;

    let config = config
        .with_overrides(rate, None)
        .context("invalid command-line override")?;
    let bs = BlackScholes::new(config.pricing.risk_free_rate);
    let price = bs.price_named(
        inputs.spot,
        inputs.strike,
        inputs.time_to_maturity,
        inputs.volatility,
        &side,
    )?;

    println!("{:.4}", price);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("options_etl=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Ingest {
            symbol,
            db,
            rate,
            as_of,
        } => cmd_ingest(config, symbol, db, rate, as_of).await?,
        Commands::Explore { symbol } => cmd_explore(config, symbol).await?,
        Commands::Price {
            spot,
            strike,
            time,
            vol,
            side,
            rate,
        } => cmd_price(config, spot, strike, time, vol, side, rate)?,
    }

    Ok(())
}
