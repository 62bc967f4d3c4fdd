//! Natural key → surrogate id resolution for the dimension tables.
//!
//! The database is the source of truth; a [`Resolver`] only memoizes what it
//! has already seen. Open dimensions (areas) insert on a miss with
//! `ON CONFLICT DO NOTHING` and then re-select, so resolving the same key
//! twice never creates a second row. Closed vocabularies (symbols,
//! geo-levels) never insert and report a miss as `None`.

use std::{collections::HashMap, marker::PhantomData};

use census_core::dimension::NewArea;
use rusqlite::{Connection, OptionalExtension as _};

use crate::{Error, Result};

// ─── Dimensions ──────────────────────────────────────────────────────────────

/// A dimension table keyed by a unique natural key.
pub trait Dimension {
  const NAME: &'static str;

  /// Attributes needed to create a row on a miss.
  type Attrs;

  fn select(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>>;

  /// Insert a row for `key`, ignoring uniqueness conflicts. Returns the
  /// number of rows written, or `None` for a closed vocabulary.
  fn insert(
    conn: &Connection,
    key: &str,
    attrs: &Self::Attrs,
  ) -> rusqlite::Result<Option<usize>>;
}

pub struct AreaDimension;

impl Dimension for AreaDimension {
  const NAME: &'static str = "area";

  type Attrs = NewArea;

  fn select(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn
      .prepare_cached("SELECT area_id FROM area WHERE dguid = ?1")?
      .query_row([key], |row| row.get(0))
      .optional()
  }

  fn insert(
    conn: &Connection,
    key: &str,
    attrs: &NewArea,
  ) -> rusqlite::Result<Option<usize>> {
    let changes = conn
      .prepare_cached(
        "INSERT INTO area (dguid, alt_geo_code, geo_level_id, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT DO NOTHING",
      )?
      .execute(rusqlite::params![
        key,
        attrs.alt_geo_code,
        attrs.geo_level_id,
        attrs.name,
      ])?;
    Ok(Some(changes))
  }
}

pub struct SymbolDimension;

impl Dimension for SymbolDimension {
  const NAME: &'static str = "symbol";

  type Attrs = ();

  fn select(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn
      .prepare_cached("SELECT symbol_id FROM symbol WHERE representation = ?1")?
      .query_row([key], |row| row.get(0))
      .optional()
  }

  fn insert(_: &Connection, _: &str, _: &()) -> rusqlite::Result<Option<usize>> {
    Ok(None)
  }
}

pub struct GeoLevelDimension;

impl Dimension for GeoLevelDimension {
  const NAME: &'static str = "geo_level";

  type Attrs = ();

  fn select(conn: &Connection, key: &str) -> rusqlite::Result<Option<i64>> {
    conn
      .prepare_cached("SELECT geo_level_id FROM geo_level WHERE name = ?1")?
      .query_row([key], |row| row.get(0))
      .optional()
  }

  fn insert(_: &Connection, _: &str, _: &()) -> rusqlite::Result<Option<usize>> {
    Ok(None)
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Memoizing resolver for one dimension.
///
/// Keys whose rows were inserted inside the current transaction are tracked
/// until [`Resolver::commit`]; [`Resolver::rollback`] forgets them so an id
/// that was rolled back is never handed out again.
pub struct Resolver<D> {
  cache:       HashMap<String, i64>,
  uncommitted: Vec<String>,
  _dimension:  PhantomData<D>,
}

impl<D: Dimension> Default for Resolver<D> {
  fn default() -> Self {
    Self {
      cache:       HashMap::new(),
      uncommitted: Vec::new(),
      _dimension:  PhantomData,
    }
  }
}

impl<D: Dimension> Resolver<D> {
  /// Resolve `key` (trimmed) to its surrogate id, inserting a row from
  /// `attrs` if the dimension is open and the key is new. `line` is the
  /// source line that referenced the key.
  pub fn resolve(
    &mut self,
    conn: &Connection,
    key: &str,
    attrs: &D::Attrs,
    line: usize,
  ) -> Result<Option<i64>> {
    let key = key.trim();
    if let Some(id) = self.cache.get(key) {
      return Ok(Some(*id));
    }

    if let Some(id) = D::select(conn, key)? {
      self.cache.insert(key.to_owned(), id);
      return Ok(Some(id));
    }

    let Some(changes) = D::insert(conn, key, attrs)? else {
      return Ok(None);
    };
    let id = D::select(conn, key)?.ok_or_else(|| Error::Unresolved {
      line,
      dimension: D::NAME,
      key:       key.to_owned(),
    })?;

    self.cache.insert(key.to_owned(), id);
    if changes > 0 {
      self.uncommitted.push(key.to_owned());
    }
    Ok(Some(id))
  }

  /// Rows inserted since the last commit or rollback.
  pub fn pending(&self) -> usize { self.uncommitted.len() }

  pub fn commit(&mut self) { self.uncommitted.clear(); }

  pub fn rollback(&mut self) {
    for key in self.uncommitted.drain(..) {
      self.cache.remove(&key);
    }
  }

  #[cfg(test)]
  pub fn cached(&self, key: &str) -> Option<i64> { self.cache.get(key).copied() }
}

// ─── Resolvers ───────────────────────────────────────────────────────────────

/// The resolver state shared by every load against one store.
#[derive(Default)]
pub struct Resolvers {
  pub areas:      Resolver<AreaDimension>,
  pub symbols:    Resolver<SymbolDimension>,
  pub geo_levels: Resolver<GeoLevelDimension>,
}

impl Resolvers {
  /// An absent or blank symbol resolves to no symbol; anything else must be
  /// in the seeded vocabulary.
  pub fn symbol(
    &mut self,
    conn: &Connection,
    representation: Option<&str>,
    line: usize,
  ) -> Result<Option<i64>> {
    let Some(representation) = representation.map(str::trim).filter(|s| !s.is_empty())
    else {
      return Ok(None);
    };
    match self.symbols.resolve(conn, representation, &(), line)? {
      Some(id) => Ok(Some(id)),
      None => Err(Error::UnknownSymbol { line, symbol: representation.to_owned() }),
    }
  }

  pub fn geo_level(&mut self, conn: &Connection, name: &str, line: usize) -> Result<i64> {
    self
      .geo_levels
      .resolve(conn, name, &(), line)?
      .ok_or_else(|| Error::UnknownGeoLevel { line, name: name.trim().to_owned() })
  }

  pub fn area(
    &mut self,
    conn: &Connection,
    dguid: &str,
    attrs: &NewArea,
    line: usize,
  ) -> Result<i64> {
    self.areas.resolve(conn, dguid, attrs, line)?.ok_or_else(|| Error::Unresolved {
      line,
      dimension: AreaDimension::NAME,
      key:       dguid.to_owned(),
    })
  }
}
