//! Error type for `census-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] census_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  /// Symbol code outside the seeded vocabulary.
  #[error("unknown symbol {symbol:?} at line {line}")]
  UnknownSymbol { line: usize, symbol: String },

  #[error("unknown geo-level {name:?} at line {line}")]
  UnknownGeoLevel { line: usize, name: String },

  /// A fact references a characteristic that was never loaded.
  #[error("unknown characteristic {characteristic_id} at line {line}")]
  UnknownCharacteristic { line: usize, characteristic_id: i64 },

  /// An insert was ignored but the natural key still does not resolve,
  /// typically because another unique column already belongs to a different
  /// row.
  #[error("{dimension} key {key:?} at line {line} could not be resolved")]
  Unresolved {
    line:      usize,
    dimension: &'static str,
    key:       String,
  },

  #[error("store is already initialized (schema version {version})")]
  AlreadyInitialized { version: i64 },

  /// A batch failed twice. `row` is the record being written when the second
  /// attempt failed.
  #[error("batch of lines {first_line}..={last_line} failed to commit at {row}: {source}")]
  BatchCommitFailure {
    first_line: usize,
    last_line:  usize,
    row:        String,
    #[source]
    source:     rusqlite::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
