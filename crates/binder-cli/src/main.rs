mod inventory;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use binder_core::InventoryRow;
use binder_prices::{
    value_best_available, value_inventory, PriceService, PriceServiceConfig, PriceSource,
    RefreshOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "binder")]
#[command(about = "Trading-card collection manager — price intelligence tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh the price cache from upstream when stale.
    Refresh {
        /// Refresh even if the cache is still fresh.
        #[arg(long)]
        force: bool,
    },
    /// Report service state, index sizes, and cache freshness.
    Status,
    /// Look up both retail channels for one Scryfall printing id.
    Price { scryfall_id: Uuid },
    /// Value an inventory file against the price cache.
    Value {
        /// JSON array of {scryfallId, quantity, purchasePrice?} rows.
        #[arg(long)]
        inventory: PathBuf,
        /// Also compute the single best-available total per row.
        #[arg(long)]
        best_available: bool,
        /// Preferred channel for best-available mode.
        #[arg(long, default_value = "cardkingdom")]
        preferred: PriceSource,
    },
    /// Run resident: load the cache, then refresh on the configured cadence.
    Daemon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = binder_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let service = PriceService::new(PriceServiceConfig::from_app_config(&config))?;
    service.initialize().await;

    match cli.command {
        Commands::Refresh { force } => run_refresh(&service, force).await,
        Commands::Status => {
            run_status(&service);
            Ok(())
        }
        Commands::Price { scryfall_id } => {
            run_price(&service, &scryfall_id);
            Ok(())
        }
        Commands::Value {
            inventory,
            best_available,
            preferred,
        } => run_value(&service, &inventory, best_available, preferred),
        Commands::Daemon => run_daemon(service, &config).await,
    }
}

async fn run_refresh(service: &Arc<PriceService>, force: bool) -> anyhow::Result<()> {
    if !force && !service.is_stale() {
        println!("price cache is fresh; nothing to do (--force to refresh anyway)");
        return Ok(());
    }
    match service.refresh().await {
        RefreshOutcome::Coalesced => println!("joined an in-flight refresh"),
        RefreshOutcome::Completed(report) => {
            println!(
                "prices: {} printings ({})",
                report.price_count,
                if report.prices_rebuilt {
                    "refreshed"
                } else {
                    "preserved"
                }
            );
            println!(
                "bridge: {} mappings ({})",
                report.bridge_count,
                if report.bridge_rebuilt {
                    "refreshed"
                } else {
                    "preserved"
                }
            );
            if !report.prices_rebuilt && !report.bridge_rebuilt {
                anyhow::bail!("both upstream documents failed; previous cache preserved");
            }
        }
    }
    Ok(())
}

fn run_status(service: &PriceService) {
    let snapshot = service.snapshot();
    println!("state:        {}", service.state());
    println!("ready:        {}", service.is_ready());
    println!("stale:        {}", service.is_stale());
    println!("prices:       {} printings", snapshot.prices.len());
    println!("bridge:       {} mappings", snapshot.catalog_map.len());
    match snapshot.refreshed_at {
        Some(ts) => println!("refreshed at: {ts}"),
        None => println!("refreshed at: never"),
    }
}

fn run_price(service: &PriceService, scryfall_id: &Uuid) {
    let prices = service.prices_by_scryfall_id(scryfall_id);
    for source in PriceSource::ALL {
        match prices.get(source) {
            Some(price) => println!("{source}: ${price}"),
            None => println!("{source}: no price"),
        }
    }
}

fn run_value(
    service: &PriceService,
    path: &std::path::Path,
    best_available: bool,
    preferred: PriceSource,
) -> anyhow::Result<()> {
    let file_rows = inventory::load_inventory(path)?;
    let rows: Vec<InventoryRow> = file_rows.iter().map(|r| r.as_inventory_row()).collect();

    let totals = value_inventory(service, &rows);
    println!("cardkingdom total:       ${}", totals.cardkingdom);
    println!("tcgplayer total:         ${}", totals.tcgplayer);
    println!("rows missing identifier: {}", totals.rows_missing_identifier);
    println!("rows missing price:      {}", totals.rows_missing_price);

    if best_available {
        let pairs: Vec<(&InventoryRow, Option<Decimal>)> = rows
            .iter()
            .zip(file_rows.iter().map(|r| r.purchase_price))
            .collect();
        let total = value_best_available(service, pairs, preferred);
        println!("best-available total:    ${total} ({preferred} preferred)");
    }
    Ok(())
}

async fn run_daemon(
    service: Arc<PriceService>,
    config: &binder_core::AppConfig,
) -> anyhow::Result<()> {
    if service.is_stale() {
        tracing::info!("price cache stale at startup; refreshing in the background");
        service.spawn_refresh();
    }

    let mut scheduler = JobScheduler::new().await?;
    let job_service = Arc::clone(&service);
    let job = Job::new_async(config.refresh_cron.as_str(), move |_id, _scheduler| {
        let service = Arc::clone(&job_service);
        Box::pin(async move {
            if service.is_stale() {
                service.refresh().await;
            } else {
                tracing::debug!("scheduled check: price cache still fresh");
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(cron = %config.refresh_cron, "binder price daemon running");

    shutdown_signal().await;
    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
