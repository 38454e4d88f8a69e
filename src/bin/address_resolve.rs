//! Address resolution CLI
//!
//! Resolves one address against the configured database and geocoder and
//! prints the stored address as JSON.
//!
//! Usage:
//!   cargo run --features cli --bin address-resolve -- \
//!     "10855 S River Front Pkwy #300, South Jordan, UT 84095, USA"
//!
//!   # Component map, replace-only subpremise policy
//!   cargo run --features cli --bin address-resolve -- --replace-only \
//!     '{"street_number": "1", "route": "Some Street", "subpremise": "300",
//!       "locality": "Melbourne", "state": "Victoria", "country": "Australia"}'
//!
//!   # Read back an existing address
//!   cargo run --features cli --bin address-resolve -- --id 4b1f...

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use address_resolver::{
    AddressField, AddressId, AddressStore, GeocodeGateway, GoogleGeocoder, InMemoryAddressStore,
    PgAddressStore, ResolverConfig,
};

/// Resolve an address into the country/state/locality hierarchy
#[derive(Parser, Debug)]
#[command(name = "address-resolve")]
#[command(about = "Resolve and store a postal address")]
struct Args {
    /// Raw address string, or a JSON object of address components
    #[arg(required_unless_present = "id")]
    address: Option<String>,

    /// Load an existing address instead of resolving a new one
    #[arg(long, conflicts_with = "address")]
    id: Option<uuid::Uuid>,

    /// YAML configuration file
    #[arg(long, short, env = "ADDRESS_RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// Keep addresses in memory instead of Postgres
    #[arg(long)]
    in_memory: bool,

    /// Do not call the geocoder
    #[arg(long)]
    no_geocode: bool,

    /// Keep the requested subpremise when the geocoder returns none
    #[arg(long)]
    ignore_missing_subpremise: bool,

    /// Re-query once with the requested subpremise substituted
    #[arg(long)]
    retry_with_replace: bool,

    /// Overwrite the geocoded subpremise with the requested one
    #[arg(long)]
    replace_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "address_resolver=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    config.subpremise.ignore_missing_subpremise |= args.ignore_missing_subpremise;
    config.subpremise.subpremise_retry_with_replace |= args.retry_with_replace;
    config.subpremise.subpremise_replace_only |= args.replace_only;
    if args.no_geocode {
        config.geocode.enabled = false;
    }

    let store: Arc<dyn AddressStore> = if args.in_memory {
        Arc::new(InMemoryAddressStore::new())
    } else {
        Arc::new(
            PgAddressStore::connect(&config.database)
                .await
                .context("Failed to connect to database")?,
        )
    };

    let gateway: Option<Arc<dyn GeocodeGateway>> = if config.geocode.enabled {
        match GoogleGeocoder::new(&config.geocode) {
            Ok(geocoder) => Some(Arc::new(geocoder)),
            Err(e) => {
                warn!("Geocoding disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let field = AddressField::new(store, gateway, &config);

    let resolved = match (args.id, args.address) {
        (Some(id), _) => field.load(AddressId::from(id)).await?,
        (None, Some(address)) => {
            let value = if address.trim_start().starts_with('{') {
                serde_json::from_str(&address).context("Address components are not valid JSON")?
            } else {
                serde_json::Value::String(address)
            };
            field.assign_json(value).await?
        }
        (None, None) => anyhow::bail!("Nothing to resolve"),
    };

    info!(address_id = %resolved.id(), display = %resolved, "Resolved address");
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
