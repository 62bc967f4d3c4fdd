//! census-load binary.
//!
//! Reads `census.toml` (or the path specified with `--config`), creates a
//! fresh SQLite database, rebuilds the characteristic hierarchy and streams
//! each regional census extract into it, in order.
//!
//! ```
//! cargo run -p census-load -- --database census.sqlite3 data_Territories.TAB
//! ```

mod settings;

use std::{
  fs::File,
  io::BufReader,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use census_core::{
  hierarchy::{census_entries, reconstruct, reference_entries},
  store::{CensusStore, LoadOptions},
};
use census_store_sqlite::SqliteStore;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::LoaderConfig;

/// Read buffer for the extracts.
const READ_BUFFER: usize = 1 << 20;

#[derive(Parser)]
#[command(author, version, about = "Load census extracts into SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "census.toml")]
  config: PathBuf,

  /// Destination database; overrides `database` from the configuration.
  #[arg(short, long)]
  database: Option<PathBuf>,

  /// Rebuild the characteristic hierarchy from the first extract instead of
  /// the reference extract.
  #[arg(long)]
  characteristics_from_extract: bool,

  /// Print each load report to stdout as JSON.
  #[arg(long)]
  json: bool,

  /// Extracts to load after the ones listed in the configuration.
  extracts: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let layered = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("CENSUS"))
    .build()
    .context("failed to read config file")?;

  let mut cfg: LoaderConfig = layered
    .try_deserialize()
    .context("failed to deserialise LoaderConfig")?;
  if let Some(database) = cli.database.clone() {
    cfg.database = database;
  }
  cfg.extracts.extend(cli.extracts.iter().cloned());
  let cfg = cfg.expand_paths();

  let mut store = SqliteStore::open(&cfg.database)
    .with_context(|| format!("failed to open store at {:?}", cfg.database))?;
  store
    .initialize()
    .with_context(|| format!("failed to initialize {:?}", cfg.database))?;

  let characteristics = if cli.characteristics_from_extract {
    let first = cfg
      .extracts
      .first()
      .context("--characteristics-from-extract needs at least one extract")?;
    store.load_characteristics(reconstruct(census_entries(open(first)?, true)))
  } else {
    let path = cfg
      .characteristics
      .as_ref()
      .context("no characteristic reference extract configured")?;
    store.load_characteristics(reconstruct(reference_entries(open(path)?)))
  }
  .context("failed to load characteristics")?;
  tracing::info!(characteristics, "characteristic hierarchy ready");

  let options = LoadOptions { batch_size: cfg.batch_size, has_header: true };
  for path in &cfg.extracts {
    let source = path.display().to_string();
    let report = store
      .load_census(&source, open(path)?, &options)
      .with_context(|| format!("failed to load {source}"))?;
    if cli.json {
      println!("{}", serde_json::to_string(&report)?);
    }
  }

  store.optimize().context("failed to optimize store")?;
  let counts = store.row_counts()?;
  tracing::info!(
    areas = counts.areas,
    characteristics = counts.characteristics,
    facts = counts.facts,
    "load complete"
  );

  Ok(())
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
  let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
  Ok(BufReader::with_capacity(READ_BUFFER, file))
}
