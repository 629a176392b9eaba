mod page;
mod server;

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use maven_market_core::dashboard::DashboardQuery;
use maven_market_core::panel::DashboardResponse;
use maven_market_core::schema;
use maven_market_core::snapshot::DashboardSnapshot;
use maven_market_providers::market_csv::write_market_csv;
use maven_market_providers::provider::MarketPriceProvider;
use maven_market_providers::yahoo::{COFFEE_FUTURES_SYMBOL, YahooProvider};
use tracing::{info, warn};

use crate::server::AppState;

#[derive(Parser)]
#[command(
    name = "maven-dashboard",
    about = "Compare Maven coffee orders against the coffee futures market"
)]
struct Cli {
    /// Order records with Date, Product, BagPrice, Bags (.csv or .parquet)
    #[arg(long, default_value = "maven_orders.csv")]
    orders: PathBuf,

    /// Market prices with Date, MarketPrices (.csv or .parquet)
    #[arg(long, default_value = "coffee_market.csv")]
    market: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on
        #[arg(long, default_value_t = 8050)]
        port: u16,
    },

    /// Print the KPI panel for one product and date range
    Summary {
        /// Product (defaults to the first in the catalog)
        #[arg(short, long)]
        product: Option<String>,

        /// Start date (YYYY-MM-DD, defaults to the first order)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD, defaults to the last order)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// List products and the order date range
    Catalog,

    /// Write the derived market candles to a Parquet file
    ExportCandles {
        /// Output path
        #[arg(long)]
        out: PathBuf,
    },

    /// Download the daily market series from Yahoo Finance
    FetchMarket {
        /// Yahoo Finance symbol
        #[arg(long, default_value = COFFEE_FUTURES_SYMBOL)]
        symbol: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD, defaults to yesterday)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output CSV (defaults to the --market path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_snapshot(orders: &Path, market: &Path) -> Result<DashboardSnapshot> {
    DashboardSnapshot::load(orders, market).with_context(|| {
        format!(
            "failed to load dashboard data from {} and {}",
            orders.display(),
            market.display()
        )
    })
}

async fn cmd_serve(snapshot: DashboardSnapshot, bind: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    let app = server::router(Arc::new(AppState { snapshot }));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Dashboard listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping");
}

fn render_summary(response: &DashboardResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} from {} to {}",
        response.product, response.start, response.end
    );
    if let Some(notice) = &response.notice {
        let _ = writeln!(out, "{notice}");
        return out;
    }
    for card in &response.kpis {
        let _ = writeln!(out, "{:<14} {}", format!("{}:", card.label), card.value);
    }
    out
}

fn cmd_summary(
    snapshot: &DashboardSnapshot,
    product: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) {
    let query = DashboardQuery {
        product,
        start,
        end,
    };
    let (resolved, result) = query.run(snapshot);
    print!("{}", render_summary(&DashboardResponse::new(&resolved, &result)));
}

fn cmd_catalog(snapshot: &DashboardSnapshot) {
    let bounds = snapshot.date_bounds();
    println!(
        "{} order(s) from {} to {}",
        snapshot.orders().len(),
        bounds.min,
        bounds.max
    );
    println!(
        "{} market price(s), {} candle(s)",
        snapshot.market_prices().len(),
        snapshot.market_candles().len()
    );
    for product in snapshot.product_catalog() {
        println!("  {product}");
    }
}

fn cmd_export_candles(snapshot: &DashboardSnapshot, out: &Path) -> Result<()> {
    schema::write_candles_parquet(out, snapshot.market_candles())
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!(
        "Wrote {} candle(s) to {}",
        snapshot.market_candles().len(),
        out.display()
    );
    Ok(())
}

async fn cmd_fetch_market(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    out: &Path,
) -> Result<()> {
    let provider = YahooProvider::new().context("failed to create Yahoo provider")?;
    info!("Using provider: {}", provider.name());

    let prices = provider
        .fetch_daily_prices(symbol, start, end)
        .await
        .with_context(|| format!("failed to fetch {symbol} from {start} to {end}"))?;

    write_market_csv(out, &prices).with_context(|| format!("failed to write {}", out.display()))?;
    info!(
        "{symbol}: wrote {} daily price(s) to {}",
        prices.len(),
        out.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Commands::Serve { bind, port } => {
            let snapshot = load_snapshot(&cli.orders, &cli.market)?;
            cmd_serve(snapshot, &bind, port).await?;
        }
        Commands::Summary {
            product,
            start,
            end,
        } => {
            let snapshot = load_snapshot(&cli.orders, &cli.market)?;
            cmd_summary(&snapshot, product, start, end);
        }
        Commands::Catalog => {
            let snapshot = load_snapshot(&cli.orders, &cli.market)?;
            cmd_catalog(&snapshot);
        }
        Commands::ExportCandles { out } => {
            let snapshot = load_snapshot(&cli.orders, &cli.market)?;
            cmd_export_candles(&snapshot, &out)?;
        }
        Commands::FetchMarket {
            symbol,
            start,
            end,
            out,
        } => {
            let end_date = end
                .unwrap_or_else(|| (chrono::Utc::now() - chrono::Duration::days(1)).date_naive());
            let out = out.unwrap_or_else(|| cli.market.clone());
            cmd_fetch_market(&symbol, start, end_date, &out).await?;
        }
    }

    Ok(())
}
