//! CLI commands implementation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::{FetchVia, Settings};
use crate::crawl::Crawler;
use crate::fields::FieldMap;
use crate::scrapers::PageFetcher;
use crate::services::{ProspectusService, ReferenceDataService};

#[derive(Parser)]
#[command(name = "bonds")]
#[command(about = "Bond reference data and prospectus acquisition system")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to bondacquire.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory (overrides config file)
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    /// Fetch strategy (overrides config file)
    #[arg(long, global = true, value_enum)]
    via: Option<FetchVia>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Collect bond reference data into a dated CSV
    ReferenceData {
        /// Limit number of bonds to parse (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Download prospectus documents for listed bonds
    Prospectus {
        /// Limit number of bonds to scan (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Collect reference data, then download prospectuses
    All {
        /// Limit number of bonds (0 = unlimited)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(out) = cli.out {
        settings.output_dir = out;
    }
    if let Some(via) = cli.via {
        settings.via = via;
    }

    let field_map = match &settings.field_map {
        Some(path) => FieldMap::load(path)?,
        None => FieldMap::default(),
    };

    let mut fetcher = PageFetcher::from_settings(&settings)?;

    let outcome = match cli.command {
        Commands::ReferenceData { limit } => {
            run_reference_data(&settings, &field_map, &mut fetcher, limit).await
        }
        Commands::Prospectus { limit } => run_prospectus(&settings, &mut fetcher, limit).await,
        Commands::All { limit } => {
            match run_reference_data(&settings, &field_map, &mut fetcher, limit).await {
                Ok(bonds) => {
                    let client = fetcher.http_client().clone();
                    let service = ProspectusService::new(&settings);
                    let result = service.run(&mut fetcher, &client, &bonds).await;
                    print_prospectus_summary(&result);
                    Ok(Vec::new())
                }
                Err(e) => Err(e),
            }
        }
    };

    fetcher.close().await;
    outcome.map(|_| ())
}

/// Run the reference-data phase and return the bonds it found, so the
/// `all` command can feed them to the prospectus phase.
async fn run_reference_data(
    settings: &Settings,
    field_map: &FieldMap,
    fetcher: &mut PageFetcher,
    limit: usize,
) -> anyhow::Result<Vec<crate::models::BondSummary>> {
    let service = ReferenceDataService::new(settings, field_map);
    let result = service.run(fetcher, limit).await?;

    let status = if result.listing_aborted {
        style("partial").yellow()
    } else {
        style("done").green()
    };
    println!(
        "{status} reference data: {} bonds found, {} parsed, {} skipped, {} failed",
        result.bonds.len(),
        result.bonds_parsed,
        result.details_skipped,
        result.details_failed,
    );
    if let Some(ref path) = result.output_path {
        println!("  output: {}", path.display());
    }

    if result.bonds.is_empty() && result.listing_pages_failed > 0 {
        anyhow::bail!("listing crawl produced no bonds");
    }

    Ok(result.bonds)
}

async fn run_prospectus(
    settings: &Settings,
    fetcher: &mut PageFetcher,
    limit: usize,
) -> anyhow::Result<Vec<crate::models::BondSummary>> {
    let mut outcome = Crawler::new(fetcher, settings).collect_summaries().await;
    if limit > 0 && outcome.bonds.len() > limit {
        outcome.bonds.truncate(limit);
    }

    if outcome.bonds.is_empty() {
        anyhow::bail!("listing crawl produced no bonds");
    }

    let client = fetcher.http_client().clone();
    let service = ProspectusService::new(settings);
    let result = service.run(fetcher, &client, &outcome.bonds).await;
    print_prospectus_summary(&result);

    Ok(outcome.bonds)
}

fn print_prospectus_summary(result: &crate::services::ProspectusResult) {
    let status = if result.failures == 0 {
        style("done").green()
    } else {
        style("partial").yellow()
    };
    println!(
        "{status} prospectuses: {} bonds scanned, {} downloaded, {} already present, {} failed",
        result.bonds_scanned, result.files_downloaded, result.files_skipped, result.failures,
    );
}
