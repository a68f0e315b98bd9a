//! blematch - inspect the supported peripheral catalog and classify scans

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use blematch::catalog::CatalogFile;
use blematch::{uuid16, DiscoveredPeripheralRecord, MatchDecision, Matcher, Registry};

#[derive(Parser)]
#[command(name = "blematch", about = "Supported BLE peripheral recognition")]
struct Cli {
    /// Catalog file to use instead of the built-in catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog entries
    List,

    /// Build the registry and report configuration errors
    Validate,

    /// Match a record described on the command line
    Match {
        /// Advertised local name
        #[arg(long)]
        name: Option<String>,

        /// Advertised service UUID (16-bit short form or full), repeatable
        #[arg(long = "service")]
        services: Vec<String>,

        /// Manufacturer data as hex, company identifier first
        #[arg(long)]
        manufacturer_data: Option<String>,

        /// Print the info map instead of the descriptor
        #[arg(long)]
        info: bool,
    },

    /// Parse raw advertising data (hex) and match it
    MatchAdv {
        /// AD structures as hex
        data: String,

        /// Print the info map instead of the descriptor
        #[arg(long)]
        info: bool,
    },
}

fn load_registry(catalog: Option<&PathBuf>) -> Result<Registry> {
    match catalog {
        Some(path) => CatalogFile::load(path)?
            .into_registry()
            .with_context(|| format!("invalid catalog {}", path.display())),
        None => Registry::builtin().context("built-in catalog is invalid"),
    }
}

fn print_decision(matcher: Matcher<'_>, record: &DiscoveredPeripheralRecord, info: bool) -> Result<()> {
    log::debug!("Matching {:?}", record);
    match matcher.decide(record) {
        MatchDecision::Matched { descriptor, .. } => {
            let out = if info {
                serde_json::to_string_pretty(descriptor.info())?
            } else {
                serde_json::to_string_pretty(descriptor)?
            };
            println!("{out}");
        }
        MatchDecision::NoCandidate => println!("no match"),
        MatchDecision::Ambiguous {
            specificity,
            models,
        } => println!("no match ({models} models tied at specificity {specificity})"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let registry = load_registry(cli.catalog.as_ref())?;
            for (signature, descriptor) in registry.all_signatures() {
                println!(
                    "{:<16} {:<14} {:<26} {}",
                    descriptor.model(),
                    descriptor.profile(),
                    descriptor.display_name(),
                    signature
                );
            }
        }
        Commands::Validate => {
            let path = cli
                .catalog
                .as_ref()
                .ok_or_else(|| anyhow!("--catalog is required for validate"))?;
            let registry = load_registry(Some(path))?;
            println!(
                "OK: {} models, {} signatures",
                registry.descriptors().len(),
                registry.len()
            );
        }
        Commands::Match {
            name,
            services,
            manufacturer_data,
            info,
        } => {
            let registry = load_registry(cli.catalog.as_ref())?;
            let mut record = DiscoveredPeripheralRecord::new();
            if let Some(name) = name {
                record = record.with_name(name);
            }
            for service in &services {
                let uuid = uuid16::parse(service)
                    .ok_or_else(|| anyhow!("invalid service UUID: {service}"))?;
                record = record.with_service(uuid);
            }
            if let Some(data) = manufacturer_data {
                record = record.with_manufacturer_data(
                    hex::decode(data.trim()).context("invalid manufacturer data hex")?,
                );
            }
            print_decision(Matcher::new(&registry), &record, info)?;
        }
        Commands::MatchAdv { data, info } => {
            let registry = load_registry(cli.catalog.as_ref())?;
            let bytes = hex::decode(data.trim()).context("invalid advertisement hex")?;
            let record = DiscoveredPeripheralRecord::from_advertisement(None, &bytes);
            print_decision(Matcher::new(&registry), &record, info)?;
        }
    }

    Ok(())
}
