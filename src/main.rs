use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pinpoint::batch;
use pinpoint::config::GeocoderConfig;
use pinpoint::location::defaults::has_centroid;
use pinpoint::location::{
    country_display_name, country_iso_code, default_coordinate_for, infer_country_with,
    AddressInput, LocationResolver,
};

/// Pinpoint — address geocoder for map points of interest
///
/// Resolves free-form, multi-script postal addresses into validated
/// coordinates, inferring the country when the form default is wrong.
///
/// Examples:
///   pinpoint locate --address "Rynek Główny 1" --postal-code 31-042 --city Kraków
///   pinpoint locate --city Bruxelles --name "Maison du Roi" --no-fallback
///   pinpoint batch venues.json
///   pinpoint infer "ul. Floriańska 1, 31-021 Kraków"
///   pinpoint centroid polska
///   pinpoint serve --port 8080
#[derive(Parser)]
#[command(name = "pinpoint", version, about, long_about = None)]
struct Cli {
    /// Config file (JSON). Defaults to ~/.pinpoint/config.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: never call the geocoding provider.
    #[arg(long, global = true)]
    offline: bool,

    /// Provider search endpoint (Nominatim-compatible).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Preferred result language (accept-language).
    #[arg(long, global = true)]
    language: Option<String>,

    /// Per-request deadline in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Pause between provider calls in milliseconds.
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve one address and print it as JSON.
    Locate(LocateArgs),
    /// Resolve a JSON array of addresses, one JSON line per record.
    Batch {
        file: PathBuf,
        /// Report unresolved records instead of substituting a centroid.
        #[arg(long)]
        no_fallback: bool,
    },
    /// Show which country the text points to.
    Infer {
        text: String,
        /// Business or venue name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the fallback centroid for a country.
    Centroid { country: String },
    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args)]
struct LocateArgs {
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    postal_code: String,
    #[arg(long, default_value = "")]
    city: String,
    /// Country as captured; blank or the baseline market triggers inference.
    #[arg(long, default_value = "")]
    country: String,
    /// Business or venue name.
    #[arg(long)]
    name: Option<String>,
    /// Previously stored latitude.
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,
    /// Previously stored longitude.
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,
    /// Exit with an error instead of using the country centroid.
    #[arg(long)]
    no_fallback: bool,
}

impl From<LocateArgs> for AddressInput {
    fn from(args: LocateArgs) -> Self {
        Self {
            address: args.address,
            postal_code: args.postal_code,
            city: args.city,
            country: args.country,
            name: args.name,
            lat: args.lat,
            lon: args.lon,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "pinpoint=debug" } else { "pinpoint=info" };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli);

    match cli.command {
        Command::Locate(args) => {
            let no_fallback = args.no_fallback;
            let input = AddressInput::from(args);
            let resolver = build_resolver(config, cli.offline);

            let resolved = if no_fallback {
                resolver.resolve(&input).await
            } else {
                Some(resolver.resolve_or_default(&input).await)
            };

            match resolved {
                Some(loc) => {
                    eprintln!("  {}", loc.display_line());
                    print_json(&loc);
                }
                None => {
                    eprintln!("Error: no acceptable coordinate for this address.");
                    std::process::exit(1);
                }
            }
        }
        Command::Batch { file, no_fallback } => {
            let inputs = batch::read_inputs(&file).unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            let resolver = build_resolver(config, cli.offline);
            let summary = batch::run_batch(&resolver, &inputs, !no_fallback, |record| {
                match serde_json::to_string(record) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("Error: cannot serialize record {}: {}", record.index, e),
                }
            })
            .await;
            eprintln!(
                "  {} resolved, {} unresolved",
                summary.resolved, summary.unresolved
            );
        }
        Command::Infer { text, name } => {
            let country = infer_country_with(&text, name.as_deref(), &config.baseline_country);
            print_json(&serde_json::json!({
                "country": country,
                "display_name": country_display_name(&country),
                "iso_code": country_iso_code(&country),
            }));
        }
        Command::Centroid { country } => {
            let coordinate = default_coordinate_for(&country, &config.baseline_country);
            print_json(&serde_json::json!({
                "country": country,
                "lat": coordinate.lat,
                "lon": coordinate.lon,
                "exact": has_centroid(&country),
            }));
        }
        Command::Serve { host, port } => {
            let resolver = build_resolver(config, cli.offline);
            if let Err(e) = pinpoint::server::start(resolver, &host, port).await {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_config(cli: &Cli) -> GeocoderConfig {
    let loaded = match &cli.config {
        Some(path) => GeocoderConfig::load_from(path),
        None => GeocoderConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(language) = &cli.language {
        config.language = language.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        config.request_timeout_ms = ms;
    }
    if let Some(ms) = cli.delay_ms {
        config.rate_limit_delay_ms = ms;
    }
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    config
}

fn build_resolver(config: GeocoderConfig, offline: bool) -> LocationResolver {
    let mut resolver = LocationResolver::from_config(config);
    resolver.set_offline(offline);
    resolver
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: cannot serialize output: {}", e);
            std::process::exit(1);
        }
    }
}
