//! SQL schema for the census SQLite store.
//!
//! Created exactly once per destination. [`initialize`] refuses to run
//! against a database that already has a `user_version` or any user table.

use census_core::dimension::{GeoLevel, Symbol};
use rusqlite::Connection;
use strum::IntoEnumIterator as _;

use crate::{Error, Result};

/// Written to `PRAGMA user_version` once the schema is in place.
pub const SCHEMA_VERSION: i64 = 1;

/// Applied to every connection on open.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA foreign_keys = ON;
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;
";

pub const SCHEMA: &str = "
CREATE TABLE geo_level (
    geo_level_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE
) STRICT;

CREATE TABLE symbol (
    symbol_id      INTEGER PRIMARY KEY,
    representation TEXT NOT NULL UNIQUE,
    description    TEXT NOT NULL UNIQUE
) STRICT;

-- Areas are created lazily from the extracts; dguid is the natural key.
CREATE TABLE area (
    area_id      INTEGER PRIMARY KEY,
    dguid        TEXT NOT NULL UNIQUE,
    alt_geo_code TEXT NOT NULL UNIQUE,
    geo_level_id INTEGER NOT NULL REFERENCES geo_level(geo_level_id),
    name         TEXT NOT NULL
) STRICT;

-- Ids come from the source. Parents are always inserted before children.
CREATE TABLE characteristic (
    characteristic_id INTEGER PRIMARY KEY,
    description       TEXT NOT NULL UNIQUE,
    note              TEXT,
    parent_id         INTEGER REFERENCES characteristic(characteristic_id)
) STRICT;

CREATE TABLE census (
    area_id                   INTEGER NOT NULL REFERENCES area(area_id),
    characteristic_id         INTEGER NOT NULL REFERENCES characteristic(characteristic_id),
    tnr_sf                    REAL NOT NULL,
    tnr_lf                    REAL NOT NULL,
    data_quality_flag         TEXT NOT NULL,
    c1_count_total            REAL,
    c1_count_total_symbol_id  INTEGER REFERENCES symbol(symbol_id),
    c2_count_men              REAL,
    c2_count_men_symbol_id    INTEGER REFERENCES symbol(symbol_id),
    c3_count_women            REAL,
    c3_count_women_symbol_id  INTEGER REFERENCES symbol(symbol_id),
    c10_rate_total            REAL,
    c10_rate_total_symbol_id  INTEGER REFERENCES symbol(symbol_id),
    c11_rate_men              REAL,
    c11_rate_men_symbol_id    INTEGER REFERENCES symbol(symbol_id),
    c12_rate_women            REAL,
    c12_rate_women_symbol_id  INTEGER REFERENCES symbol(symbol_id),
    PRIMARY KEY (area_id, characteristic_id)
) WITHOUT ROWID, STRICT;

CREATE VIEW census_view AS
SELECT
    a.dguid,
    a.alt_geo_code,
    g.name              AS geo_level,
    a.name              AS geo_name,
    c.characteristic_id,
    c.description       AS characteristic_description,
    c.note              AS characteristic_note,
    c.parent_id         AS characteristic_parent_id,
    f.tnr_sf,
    f.tnr_lf,
    f.data_quality_flag,
    f.c1_count_total,
    s1.representation   AS c1_count_total_symbol,
    f.c2_count_men,
    s2.representation   AS c2_count_men_symbol,
    f.c3_count_women,
    s3.representation   AS c3_count_women_symbol,
    f.c10_rate_total,
    s10.representation  AS c10_rate_total_symbol,
    f.c11_rate_men,
    s11.representation  AS c11_rate_men_symbol,
    f.c12_rate_women,
    s12.representation  AS c12_rate_women_symbol
FROM census f
JOIN area           a   ON a.area_id = f.area_id
JOIN geo_level      g   ON g.geo_level_id = a.geo_level_id
JOIN characteristic c   ON c.characteristic_id = f.characteristic_id
LEFT JOIN symbol    s1  ON s1.symbol_id  = f.c1_count_total_symbol_id
LEFT JOIN symbol    s2  ON s2.symbol_id  = f.c2_count_men_symbol_id
LEFT JOIN symbol    s3  ON s3.symbol_id  = f.c3_count_women_symbol_id
LEFT JOIN symbol    s10 ON s10.symbol_id = f.c10_rate_total_symbol_id
LEFT JOIN symbol    s11 ON s11.symbol_id = f.c11_rate_men_symbol_id
LEFT JOIN symbol    s12 ON s12.symbol_id = f.c12_rate_women_symbol_id;
";

/// Create the schema and seed the closed vocabularies in one transaction.
pub fn initialize(conn: &mut Connection) -> Result<()> {
  let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
  let objects: i64 = conn.query_row(
    "SELECT count(*) FROM sqlite_master
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'",
    [],
    |row| row.get(0),
  )?;
  if version != 0 || objects != 0 {
    return Err(Error::AlreadyInitialized { version });
  }

  let tx = conn.transaction()?;
  tx.execute_batch(SCHEMA)?;
  {
    let mut level = tx.prepare("INSERT INTO geo_level (name) VALUES (?1)")?;
    for geo_level in GeoLevel::iter() {
      level.execute([geo_level.name()])?;
    }

    let mut symbol =
      tx.prepare("INSERT INTO symbol (representation, description) VALUES (?1, ?2)")?;
    for code in Symbol::iter() {
      symbol.execute([code.representation(), code.description()])?;
    }
  }
  tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  tx.commit()?;

  tracing::info!(version = SCHEMA_VERSION, "initialized census schema");
  Ok(())
}
