//! Loader configuration, deserialised from `census.toml` and `CENSUS_*`
//! environment variables.

use std::path::{Path, PathBuf};

use census_core::store::DEFAULT_BATCH_SIZE;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
  /// Destination SQLite file. Must not be initialized yet.
  #[serde(default = "default_database")]
  pub database:        PathBuf,
  /// Two-column characteristic reference extract.
  #[serde(default)]
  pub characteristics: Option<PathBuf>,
  #[serde(default = "default_batch_size")]
  pub batch_size:      usize,
  /// Regional census extracts, loaded in this order.
  #[serde(default)]
  pub extracts:        Vec<PathBuf>,
}

fn default_database() -> PathBuf { PathBuf::from("census.sqlite3") }

fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }

impl LoaderConfig {
  /// Expand `~` in every configured path.
  pub fn expand_paths(mut self) -> Self {
    self.database = expand_tilde(&self.database);
    self.characteristics = self.characteristics.as_deref().map(expand_tilde);
    self.extracts = self.extracts.iter().map(|p| expand_tilde(p)).collect();
    self
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_fill_missing_keys() {
    let cfg: LoaderConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "characteristics = \"chars.txt\"",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.database, PathBuf::from("census.sqlite3"));
    assert_eq!(cfg.characteristics, Some(PathBuf::from("chars.txt")));
    assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
    assert!(cfg.extracts.is_empty());
  }

  #[test]
  fn reads_extract_list() {
    let cfg: LoaderConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "batch_size = 50\nextracts = [\"a.TAB\", \"b.TAB\"]",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.batch_size, 50);
    assert_eq!(cfg.extracts, [PathBuf::from("a.TAB"), PathBuf::from("b.TAB")]);
  }

  #[test]
  fn leaves_relative_paths_alone() {
    assert_eq!(expand_tilde(Path::new("data/a.TAB")), PathBuf::from("data/a.TAB"));
  }
}
