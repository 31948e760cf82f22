#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the bike-share trip importer.

use std::path::PathBuf;
use std::time::Instant;

use bikeshare_cli_utils::IndicatifProgress;
use bikeshare_database::{DbPool, open_pool, queries};
use bikeshare_geography::load_index;
use bikeshare_ingest::config::ImportConfig;
use bikeshare_ingest::{aggregate, areas, discover_input_files, download, run_import};
use bikeshare_ingest_models::{DEFAULT_BATCH_SIZE, ImportOptions, RunSummary};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bikeshare_ingest", about = "Bike-share trip importer")]
struct Cli {
    /// `DuckDB` file (overrides `BIKESHARE_DB_PATH`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every CSV file in the data directory, then aggregate
    Import {
        /// Directory of monthly CSV files (overrides `BIKESHARE_DATA_DIR`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Rows per trip batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Load trips without running the daily aggregation
        #[arg(long)]
        no_aggregate: bool,
        /// Re-download the community area boundaries
        #[arg(long)]
        refresh_areas: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fold every stored trip into the daily station counters.
    /// Each run adds onto the existing counters.
    Aggregate,
    /// Create the database tables
    Migrate,
    /// Download monthly trip archives and extract their CSV files
    Download {
        /// Year to download
        year: i32,
        /// Single month (1-12); all twelve when omitted
        #[arg(long)]
        month: Option<u32>,
        /// Re-download months whose CSV already exists
        #[arg(long)]
        force: bool,
        /// Destination directory (overrides `BIKESHARE_DATA_DIR`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Assign community areas to stations stored without one
    AssignAreas {
        /// Re-download the community area boundaries
        #[arg(long)]
        refresh_areas: bool,
    },
    /// Show the number of stations per community area
    Areas {
        /// Re-download the community area boundary cache first
        #[arg(long)]
        refresh: bool,
    },
}

fn open_store(config: &ImportConfig) -> Result<DbPool, Box<dyn std::error::Error>> {
    config.prepare_db_dir()?;
    log::info!("Opening {}", config.db_path.display());
    Ok(open_pool(&config.db_path)?)
}

fn print_summary(summary: &RunSummary) {
    println!("Files processed:   {}", summary.files_processed());
    println!(
        "Stations:          {} created, {} refreshed",
        summary.stations.created, summary.stations.refreshed
    );
    println!("Trips inserted:    {}", summary.trips.inserted);
    println!("Rows skipped:      {}", summary.trips.skipped);
    println!("Duplicates:        {}", summary.trips.duplicates);
    println!("Rows failed:       {}", summary.failed);
    println!("Counters touched:  {}", summary.counters_touched());
    println!("Elapsed:           {:.1}s", summary.duration.as_secs_f64());
    if let Some(abort) = &summary.aborted {
        println!("Aborted at {}: {}", abort.file.display(), abort.reason);
    }
    if let Some(error) = &summary.aggregation_error {
        println!("Aggregation failed: {error}");
    }
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let multi = bikeshare_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = ImportConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Import {
            data_dir,
            batch_size,
            no_aggregate,
            refresh_areas,
            json,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            config.require_data_dir()?;

            let files = discover_input_files(&config.data_dir)?;
            if files.is_empty() {
                log::warn!("No CSV files in {}", config.data_dir.display());
            }

            let geo = load_index(&config.areas_cache, &config.areas_url, refresh_areas).await?;
            let pool = open_store(&config)?;
            let options = ImportOptions {
                batch_size,
                aggregate: !no_aggregate,
            };

            log::info!(
                "Importing {} files from {}",
                files.len(),
                config.data_dir.display()
            );
            let progress = IndicatifProgress::rows_bar(&multi, "Importing");
            let summary = tokio::task::spawn_blocking(move || {
                run_import(&pool, &geo, &files, &options, progress.as_ref())
            })
            .await??;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }

            if let Some(abort) = summary.aborted {
                return Err(format!("import aborted at {}", abort.file.display()).into());
            }
            if let Some(error) = summary.aggregation_error {
                return Err(format!("aggregation failed: {error}").into());
            }
        }
        Commands::Aggregate => {
            let pool = open_store(&config)?;
            let start = Instant::now();
            let report = tokio::task::spawn_blocking(move || aggregate::aggregate(&pool)).await??;
            log::info!(
                "Aggregation complete in {:.1}s: {} created, {} updated, {} trip-directions counted, {} unknown bike type",
                start.elapsed().as_secs_f64(),
                report.created,
                report.updated,
                report.trips_counted,
                report.unknown_bike_type
            );
        }
        Commands::Migrate => {
            log::info!("Creating tables...");
            // Opening the pool creates the schema.
            let _pool = open_store(&config)?;
            log::info!("Tables ready.");
        }
        Commands::Download {
            year,
            month,
            force,
            data_dir,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let months = download::months(year, month)?;
            let progress = IndicatifProgress::months_bar(&multi, "Downloading");
            let report = download::download_archives(
                download::ARCHIVE_BASE_URL,
                &config.data_dir,
                &months,
                force,
                progress.as_ref(),
            )
            .await?;

            println!("Downloaded: {}", report.downloaded.join(", "));
            println!("Skipped:    {}", report.skipped.join(", "));
            for (label, reason) in &report.failed {
                println!("Failed:     {label}: {reason}");
            }
            if !report.failed.is_empty() {
                return Err(format!("{} months failed", report.failed.len()).into());
            }
        }
        Commands::AssignAreas { refresh_areas } => {
            let geo = load_index(&config.areas_cache, &config.areas_url, refresh_areas).await?;
            let pool = open_store(&config)?;
            let report =
                tokio::task::spawn_blocking(move || areas::assign_missing_areas(&pool, &geo))
                    .await??;
            println!(
                "{} stations assigned, {} outside every community area",
                report.updated, report.not_found
            );
        }
        Commands::Areas { refresh } => {
            if refresh {
                let geo = load_index(&config.areas_cache, &config.areas_url, true).await?;
                log::info!("Refreshed {} community areas", geo.len());
            }
            let pool = open_store(&config)?;
            let conn = pool.get()?;
            let counts = queries::stations_per_area(&conn)?;

            println!("{:<6} {:<28} STATIONS", "AREA", "NAME");
            println!("{}", "-".repeat(46));
            for row in &counts {
                println!(
                    "{:<6} {:<28} {}",
                    row.community_area.map_or_else(|| "-".to_string(), |a| a.to_string()),
                    row.community_area_name.as_deref().unwrap_or("(none)"),
                    row.stations
                );
            }
        }
    }

    Ok(())
}
