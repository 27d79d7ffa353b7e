//! aareguru: Aare river conditions from the command line.
//!
//! Thin binary over the service crate:
//! 1. Loads settings (.env, aareguru.toml, environment)
//! 2. Initialises logging
//! 3. Runs one subcommand and prints its result as pretty JSON

mod config;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use aareguru_service::AareguruService;
use common::config::{LogFormat, Settings};
use common::Error;

/// Aare river temperatures, flow and safety.
#[derive(Parser)]
#[command(name = "aareguru", about = "Aare river conditions from the Aareguru API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every city with measurements.
    Cities,
    /// Today's summary for a city.
    Today { city: String },
    /// Raw current conditions for a city.
    Current { city: String },
    /// Water temperature with safety and Swiss German context.
    Temperature { city: String },
    /// Full current conditions with weather and forecast.
    Conditions { city: String },
    /// Flow rate with BAFU danger level.
    Flow { city: String },
    /// Historical series (uncached).
    History {
        city: String,
        /// Start, e.g. "-7 days" or a unix timestamp.
        #[arg(long, default_value = "-7 days")]
        start: String,
        #[arg(long, default_value = "now")]
        end: String,
    },
    /// Compare cities, warmest first. No cities means all of them.
    Compare { cities: Vec<String> },
    /// Two-hour forecasts for several cities.
    Forecasts {
        #[arg(required = true)]
        cities: Vec<String>,
    },
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.as_str()));

    // Logs go to stderr so stdout stays valid JSON.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match settings.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(service: &AareguruService, command: Command) -> Result<(), Error> {
    let client = service.client();
    match command {
        Command::Cities => print_json(&service.cities_list().await?),
        Command::Today { city } => print_json(&client.get_today(&city).await?),
        Command::Current { city } => print_json(&client.get_current(&city).await?),
        Command::Temperature { city } => print_json(&service.current_temperature(&city).await?),
        Command::Conditions { city } => print_json(&service.current_conditions(&city).await?),
        Command::Flow { city } => print_json(&service.flow_danger_level(&city).await?),
        Command::History { city, start, end } => {
            print_json(&service.historical_data(&city, &start, &end).await?)
        }
        Command::Compare { cities } => {
            let cities = (!cities.is_empty()).then_some(cities);
            print_json(&service.compare_cities(cities).await?)
        }
        Command::Forecasts { cities } => print_json(&service.forecasts(&cities).await?),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match config::load_config() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&settings);

    info!(
        "Aareguru client: base_url={}, cache_ttl={}s, min_interval={}s",
        settings.base_url,
        settings.cache.ttl_seconds,
        settings.throttle.min_request_interval_seconds
    );

    let service = match AareguruService::open(&settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open client: {}", e);
            std::process::exit(1);
        }
    };

    let result = run(&service, cli.command).await;
    let metrics = service.close();
    debug!("Fetch metrics: {:?}", metrics);

    if let Err(e) = result {
        error!("{}: {}", e.kind(), e);
        std::process::exit(1);
    }
}
