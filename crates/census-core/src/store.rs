//! The `CensusStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `census-store-sqlite`).
//! The loader binary depends on this abstraction, not on any concrete backend.

use std::io::BufRead;

use serde::Serialize;

use crate::characteristic::Characteristic;

/// Default number of facts committed per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

// ─── Options and reports ─────────────────────────────────────────────────────

/// Parameters for [`CensusStore::load_census`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
  /// Facts per atomic commit. Bounds peak memory and the work lost to a
  /// failed batch.
  pub batch_size: usize,
  /// Skip the first line of the extract.
  pub has_header: bool,
}

impl Default for LoadOptions {
  fn default() -> Self {
    Self { batch_size: DEFAULT_BATCH_SIZE, has_header: true }
  }
}

/// Outcome of loading one census extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
  pub source:          String,
  pub lines_read:      usize,
  pub facts_inserted:  usize,
  /// Facts dropped because their (area, characteristic) pair already existed.
  pub facts_ignored:   usize,
  pub areas_inserted:  usize,
  pub batches:         usize,
  pub batches_retried: usize,
}

/// Number of rows per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
  pub geo_levels:      usize,
  pub symbols:         usize,
  pub areas:           usize,
  pub characteristics: usize,
  pub facts:           usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a census destination store.
///
/// All operations are blocking and run in call order; a store supports a
/// single writer.
pub trait CensusStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create tables, constraints, the read view and the seeded vocabularies.
  ///
  /// Fails without modifying the store if it was already initialized.
  fn initialize(&mut self) -> Result<(), Self::Error>;

  /// Persist a reconstructed characteristic tree, parents before children,
  /// in one transaction. Returns the number of characteristics written.
  fn load_characteristics<I>(&mut self, characteristics: I) -> Result<usize, Self::Error>
  where
    I: IntoIterator<Item = crate::Result<Characteristic>>;

  /// Stream one regional census extract into the fact table.
  ///
  /// `source` names the extract in logs and in the returned report.
  fn load_census<R: BufRead>(
    &mut self,
    source: &str,
    reader: R,
    options: &LoadOptions,
  ) -> Result<LoadReport, Self::Error>;

  fn row_counts(&self) -> Result<RowCounts, Self::Error>;
}
