//! iuvs: builds and inspects versioned IUVS data products.
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use iuvs_algorithms::{CalibrationTables, SwathCaveats};
use iuvs_core::{InstrumentConstants, Orbit, ProductStore, VersionRegistry};
use iuvs_io::{
    load_calibration, process_orbit, Hdf5Product, JsonRecordSource, PipelineContext,
    TabulatedEphemeris, DEFAULT_PLAN,
};
use rayon::prelude::*;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] iuvs_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] iuvs_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid orbit range {start}..={end}")]
    OrbitRange { start: u32, end: u32 },

    #[error("{failed} of {total} orbits failed")]
    OrbitsFailed { failed: usize, total: usize },
}

/// Incremental builder of MAVEN/IUVS data products.
#[derive(Parser)]
#[command(name = "iuvs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log every dataset decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the products of a range of orbits up to date
    Process {
        /// First orbit
        #[arg(long)]
        start: u32,

        /// Last orbit (inclusive)
        #[arg(long)]
        end: u32,

        /// Root of the exported raw records
        #[arg(long)]
        records: PathBuf,

        /// Root of the product files
        #[arg(long)]
        save: PathBuf,

        /// Version registry (JSON); the bundled registry if omitted
        #[arg(long)]
        versions: Option<PathBuf>,

        /// Swath caveat table (CSV); the bundled table if omitted
        #[arg(long)]
        caveats: Option<PathBuf>,

        /// MUV calibration file (HDF5); brightness is skipped if omitted
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Tabulated apsis ephemeris (CSV); apsis groups are skipped if omitted
        #[arg(long)]
        ephemeris: Option<PathBuf>,

        /// Product version appended to file names
        #[arg(long)]
        product_version: Option<u32>,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print a version registry
    Versions {
        /// Registry file; the bundled registry if omitted
        file: Option<PathBuf>,
    },

    /// List the datasets of a product file
    Inspect {
        /// Product file
        product: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

fn load_registry(path: Option<&Path>) -> Result<VersionRegistry> {
    Ok(match path {
        Some(path) => VersionRegistry::from_file(path)?,
        None => VersionRegistry::bundled()?,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Process {
            start,
            end,
            records,
            save,
            versions,
            caveats,
            calibration,
            ephemeris,
            product_version,
            jobs,
        } => {
            if end < start {
                return Err(CliError::OrbitRange { start, end });
            }
            let constants = InstrumentConstants::default();
            let registry = load_registry(versions.as_deref())?;
            let missing = registry.missing();
            if !missing.is_empty() {
                log::warn!("registry has no entry for {} datasets", missing.len());
            }
            let caveats = match caveats {
                Some(path) => SwathCaveats::from_path(path)?,
                None => SwathCaveats::bundled()?,
            };
            let calibration: Option<CalibrationTables> =
                calibration.map(load_calibration).transpose()?;
            let ephemeris = ephemeris.map(TabulatedEphemeris::from_path).transpose()?;

            let mut context = PipelineContext::new(&constants, &registry, &caveats);
            if let Some(tables) = &calibration {
                context = context.with_calibration(tables);
            } else {
                log::warn!("no calibration file, brightness will not be derived");
            }
            if let Some(table) = &ephemeris {
                context = context.with_ephemeris(table);
            } else {
                log::warn!("no ephemeris table, apsis groups will not be derived");
            }
            if let Some(version) = product_version {
                context = context.with_product_version(version);
            }

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs.unwrap_or(0))
                .build()?;
            let source = JsonRecordSource::new(records);
            let started = Instant::now();
            let orbits: Vec<Orbit> = (start..=end).map(Orbit::new).collect();
            log::info!(
                "processing {} orbits on {} threads",
                orbits.len(),
                pool.current_num_threads()
            );

            let failed: Vec<Orbit> = pool.install(|| {
                orbits
                    .par_iter()
                    .filter_map(|&orbit| {
                        match process_orbit(&save, &source, orbit, &DEFAULT_PLAN, &context) {
                            Ok(_) => None,
                            Err(e) => {
                                log::error!("{}: {e}", orbit.code());
                                Some(orbit)
                            }
                        }
                    })
                    .collect()
            });

            log::info!(
                "processed {} orbits in {:.2}s",
                orbits.len(),
                started.elapsed().as_secs_f64()
            );
            if failed.is_empty() {
                Ok(())
            } else {
                let codes: Vec<String> = failed.iter().map(|o| o.code()).collect();
                log::error!("failed orbits: {}", codes.join(", "));
                Err(CliError::OrbitsFailed {
                    failed: failed.len(),
                    total: orbits.len(),
                })
            }
        }

        Commands::Versions { file } => {
            let registry = load_registry(file.as_deref())?;
            println!("last_validated_orbit: {}", registry.last_validated_orbit());
            for (key, version) in registry.iter() {
                println!("{:<40} {}", key, version);
            }
            Ok(())
        }

        Commands::Inspect { product } => {
            let product = Hdf5Product::open(&product)?;
            println!("File: {}", product.path().display());
            if let Some(orbit) = product.root_attribute("orbit")? {
                println!("Orbit: {}", orbit);
            }
            if let Some(version) = product.root_attribute("version")? {
                println!("Product version: {}", version);
            }
            println!("{:<60} | {:<7} | {:<14} | shape", "dataset", "version", "unit");
            println!("{:-<100}", "");
            for path in product.dataset_paths()? {
                let data = product.read(&path)?;
                let version = product
                    .stored_version(&path)?
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                let unit = product
                    .dataset_text_attribute(&path, "unit")?
                    .unwrap_or_default();
                println!(
                    "{:<60} | {:<7} | {:<14} | {:?}",
                    path,
                    version,
                    unit,
                    data.shape()
                );
            }
            Ok(())
        }
    }
}
