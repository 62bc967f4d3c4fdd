//! The SQLite implementation of [`CensusStore`].

use std::{io::BufRead, path::Path};

use census_core::{
  characteristic::Characteristic,
  dimension::Area,
  store::{CensusStore, LoadOptions, LoadReport, RowCounts},
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{
  Error, Result,
  load::FactLoader,
  resolve::Resolvers,
  schema::{self, CONNECTION_PRAGMAS},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A census store backed by a single SQLite file.
///
/// The store owns its connection and the dimension [`Resolvers`], so natural
/// keys seen in one extract resolve from cache in the next.
pub struct SqliteStore {
  pub(crate) conn:      Connection,
  pub(crate) resolvers: Resolvers,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. The schema is not created; call
  /// [`CensusStore::initialize`] on a fresh file.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::with_connection(Connection::open(path)?)
  }

  /// Open a store that lives only as long as the connection.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn.execute_batch(CONNECTION_PRAGMAS)?;
    Ok(Self { conn, resolvers: Resolvers::default() })
  }

  /// Refresh the query planner statistics; run once loading is finished.
  pub fn optimize(&self) -> Result<()> {
    self.conn.execute_batch("PRAGMA optimize;")?;
    Ok(())
  }

  pub fn get_area(&self, dguid: &str) -> Result<Option<Area>> {
    Ok(
      self
        .conn
        .query_row(
          "SELECT area_id, dguid, alt_geo_code, geo_level_id, name
           FROM area WHERE dguid = ?1",
          [dguid],
          |row| {
            Ok(Area {
              area_id:      row.get(0)?,
              dguid:        row.get(1)?,
              alt_geo_code: row.get(2)?,
              geo_level_id: row.get(3)?,
              name:         row.get(4)?,
            })
          },
        )
        .optional()?,
    )
  }

  pub fn get_characteristic(&self, id: i64) -> Result<Option<Characteristic>> {
    Ok(
      self
        .conn
        .query_row(
          "SELECT characteristic_id, description, note, parent_id
           FROM characteristic WHERE characteristic_id = ?1",
          [id],
          |row| {
            Ok(Characteristic {
              characteristic_id: row.get(0)?,
              description:       row.get(1)?,
              note:              row.get(2)?,
              parent_id:         row.get(3)?,
            })
          },
        )
        .optional()?,
    )
  }

  fn count(&self, table: &str) -> Result<usize> {
    let n: i64 =
      self
        .conn
        .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(n as usize)
  }
}

// ─── CensusStore impl ────────────────────────────────────────────────────────

impl CensusStore for SqliteStore {
  type Error = Error;

  fn initialize(&mut self) -> Result<()> { schema::initialize(&mut self.conn) }

  fn load_characteristics<I>(&mut self, characteristics: I) -> Result<usize>
  where
    I: IntoIterator<Item = census_core::Result<Characteristic>>,
  {
    let tx = self.conn.transaction()?;
    let mut written = 0;
    {
      let mut insert = tx.prepare(
        "INSERT INTO characteristic (characteristic_id, description, note, parent_id)
         VALUES (?1, ?2, ?3, ?4)",
      )?;
      for characteristic in characteristics {
        let c = characteristic?;
        insert
          .execute(rusqlite::params![
            c.characteristic_id,
            c.description,
            c.note,
            c.parent_id,
          ])
          .inspect_err(|error| {
            tracing::error!(
              characteristic_id = c.characteristic_id,
              description = %c.description,
              %error,
              "failed to insert characteristic"
            );
          })?;
        written += 1;
      }
    }
    tx.commit()?;

    tracing::info!(characteristics = written, "loaded characteristic hierarchy");
    Ok(written)
  }

  fn load_census<R: BufRead>(
    &mut self,
    source: &str,
    reader: R,
    options: &LoadOptions,
  ) -> Result<LoadReport> {
    FactLoader::new(&mut self.conn, &mut self.resolvers, source, options)?
      .run(reader, options.has_header)
  }

  fn row_counts(&self) -> Result<RowCounts> {
    Ok(RowCounts {
      geo_levels:      self.count("geo_level")?,
      symbols:         self.count("symbol")?,
      areas:           self.count("area")?,
      characteristics: self.count("characteristic")?,
      facts:           self.count("census")?,
    })
  }
}
