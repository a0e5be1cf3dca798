use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{debug, info};

use price_cli::app::{self, QuoteOverrides, SettingsUpdate};
use price_cli::{logging, replay, session};
use price_core::store::StoreConfig;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// True price of an auction lot: winning bid plus buyer's premium, lot fee
/// and sales tax.
#[derive(Debug, Parser)]
#[command(name = "true-price", version, about, long_about = None)]
struct Cli {
    /// Settings store backend (`sqlite` or `memory`).
    #[arg(long, global = true, default_value = "sqlite")]
    backend: String,

    /// Store connection string, e.g. `sqlite:true-price.db?mode=rwc` or `sqlite::memory:`.
    #[arg(long, global = true, default_value = "sqlite:true-price.db?mode=rwc")]
    db: String,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log filter; overrides RUST_LOG (e.g. `debug` or `price_sync=trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price a bid with the stored settings.
    Quote {
        /// Bid as shown on the page, e.g. "$1,234.56".
        bid: String,

        /// Buyer's premium in percent.
        #[arg(long)]
        premium: Option<Decimal>,

        /// Flat lot fee.
        #[arg(long)]
        lot_fee: Option<Decimal>,

        /// Sales tax in percent.
        #[arg(long)]
        tax: Option<Decimal>,

        /// Print the breakdown as JSON instead of overlay lines.
        #[arg(long)]
        json: bool,
    },

    /// Show or change the stored settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Replay a recorded page session (CSV) through a live synchronizer.
    Replay {
        /// Session file with `at_ms,event,value` columns.
        file: PathBuf,

        /// URL the page starts on.
        #[arg(long, default_value = "https://www.mac.bid/lot/1")]
        url: String,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the effective settings.
    Show,

    /// Update one or more settings.
    Set {
        #[arg(long)]
        premium: Option<String>,

        #[arg(long)]
        lot_fee: Option<String>,

        #[arg(long)]
        tax: Option<String>,

        /// Show the overlay on pages.
        #[arg(long, conflicts_with = "hide")]
        show: bool,

        /// Hide the overlay on pages.
        #[arg(long)]
        hide: bool,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    if let Some(level) = &cli.log_level {
        logging::set_log_level(level)?;
    }
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let store_config = StoreConfig {
        backend: cli.backend,
        connection_string: cli.db,
    };
    debug!(backend = %store_config.backend, "using settings store");
    let store = app::open_store(&store_config).await?;

    match cli.command {
        Command::Quote {
            bid,
            premium,
            lot_fee,
            tax,
            json,
        } => {
            let overrides = QuoteOverrides {
                buyers_premium_rate: premium,
                lot_fee,
                sales_tax_rate: tax,
            };
            let Some(breakdown) = app::quote(&store, &bid, &overrides).await? else {
                anyhow::bail!("cannot price '{bid}': no readable bid amount");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&breakdown)?);
            } else {
                print!("{}", app::format_quote(&breakdown));
            }
        }
        Command::Settings { action } => {
            let config = match action {
                SettingsAction::Show => app::show_settings(&store).await?,
                SettingsAction::Set {
                    premium,
                    lot_fee,
                    tax,
                    show,
                    hide,
                } => {
                    let update = SettingsUpdate {
                        buyers_premium_rate: premium,
                        lot_fee,
                        sales_tax_rate: tax,
                        show_price_overlay: (show || hide).then_some(show),
                    };
                    let config = app::update_settings(&store, update).await?;
                    info!("settings saved");
                    config
                }
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Command::Replay { file, url } => {
            let steps = session::load_from_file(&file)
                .with_context(|| format!("Failed to load session: {}", file.display()))?;
            let report = replay::replay(&steps, &url, store).await?;
            for line in &report.transcript {
                println!("{line}");
            }
            match &report.final_overlay {
                Some(overlay) => print!("\nFinal overlay:\n{overlay}"),
                None => println!("\nNo overlay on the page."),
            }
        }
    }

    Ok(())
}
