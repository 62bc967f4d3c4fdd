//! Error types for `census-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A line could not be decoded into the expected fields. Fatal for the
  /// file being read.
  #[error("malformed record at line {line}: {reason}")]
  MalformedRecord { line: usize, reason: String },

  /// The indentation of a characteristic fragment is not a whole number of
  /// two-space levels, or the fragment contains the description separator.
  #[error("hierarchy format violation at line {line} ({fragment:?}): {reason}")]
  HierarchyFormatViolation {
    line:     usize,
    fragment: String,
    reason:   String,
  },

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
    Self::MalformedRecord { line, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
