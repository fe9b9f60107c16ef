use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use csv::Writer;
use dotenv::dotenv;
use tracing::{info, span, warn, Instrument, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Settings;
use crate::domain::ShippingRate;
use crate::rates::RateAggregator;

#[derive(Debug, Parser)]
#[command(name = "shipping-quote", about = "Quote shipping rates for a destination and quantity")]
pub struct Args {
    /// Delivery address.
    pub destination: String,

    /// Quantity in square metres.
    pub quantity: f64,

    /// Start address, defaults to the configured warehouse.
    #[arg(long)]
    pub origin: Option<String>,

    /// Config file, defaults to $SHIPPING_CONFIG or shipping.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write the rates to this CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

fn init_tracing_and_env() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .try_init()?;

    dotenv().ok();
    Ok(())
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    init_tracing_and_env()?;
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let origin = args
        .origin
        .clone()
        .unwrap_or_else(|| settings.general.warehouse_origin.clone());

    let aggregator = RateAggregator::from_settings(&settings)?;
    let rates = quote(&aggregator, &origin, &args.destination, args.quantity).await;
    print_rates(&rates);

    if let Some(path) = &args.csv {
        save_to_csv(&rates, path)?;
        info!("Wrote {} rates to {}", rates.len(), path.display());
    }
    Ok(())
}

async fn quote(
    aggregator: &RateAggregator,
    origin: &str,
    destination: &str,
    quantity: f64,
) -> Vec<ShippingRate> {
    let span = span!(Level::INFO, "quote", destination = %destination, quantity = quantity);
    async {
        info!("Quoting {} m2 from '{}'", quantity, origin);
        let rates = aggregator
            .compute_shipping_costs(origin, destination, quantity)
            .await;
        if rates.is_empty() {
            warn!("No carrier can ship this order");
        }
        rates
    }
    .instrument(span)
    .await
}

fn print_rates(rates: &[ShippingRate]) {
    for rate in rates {
        let distance = rate
            .distance_km
            .map(|km| format!("{:.1} km", km))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {} ({}) {} / {} [{}]",
            rate.carrier_title.bold(),
            rate.method_title,
            distance,
            rate.formatted_price_net,
            rate.formatted_price_gross.green(),
            rate.breakdown.source.as_str()
        );
        if let Some(message) = &rate.promotion {
            println!("    {}", message.yellow());
        }
    }
}

pub fn save_to_csv(rates: &[ShippingRate], path: &Path) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(path)?;

    wtr.write_record([
        "carrier_code",
        "carrier_title",
        "method_title",
        "distance_km",
        "net_price",
        "gross_price",
        "tax_rate",
        "source",
    ])?;

    for rate in rates {
        wtr.write_record([
            rate.carrier_code.clone(),
            rate.carrier_title.clone(),
            rate.method_title.clone(),
            rate.distance_km.map(|km| km.to_string()).unwrap_or_default(),
            format!("{:.2}", rate.breakdown.net_price),
            format!("{:.2}", rate.breakdown.gross_price),
            rate.breakdown.tax_rate.to_string(),
            rate.breakdown.source.as_str().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
