//! Dimension types: areas and the two closed vocabularies (symbols and
//! geo-levels) seeded into every store.

use strum::EnumIter;

use crate::record::CensusRecord;

// ─── Symbols ─────────────────────────────────────────────────────────────────

/// A code annotating the availability or reliability of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Symbol {
  NotApplicable,
  NotAvailable,
  Suppressed,
  TooUnreliable,
  UseWithCaution,
  Excellent,
  VeryGood,
  Good,
  Acceptable,
  Revised,
  Preliminary,
}

impl Symbol {
  /// The short form used in the extracts; the natural key of the symbol
  /// dimension.
  pub fn representation(self) -> &'static str {
    match self {
      Self::NotApplicable => "...",
      Self::NotAvailable => "..",
      Self::Suppressed => "x",
      Self::TooUnreliable => "F",
      Self::UseWithCaution => "E",
      Self::Excellent => "A",
      Self::VeryGood => "B",
      Self::Good => "C",
      Self::Acceptable => "D",
      Self::Revised => "r",
      Self::Preliminary => "p",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      Self::NotApplicable => "Not applicable",
      Self::NotAvailable => "Not available for a specific reference period",
      Self::Suppressed => {
        "Suppressed to meet the confidentiality requirements of the Statistics Act"
      }
      Self::TooUnreliable => "Too unreliable to be published",
      Self::UseWithCaution => "Use with caution",
      Self::Excellent => "Excellent data quality",
      Self::VeryGood => "Very good data quality",
      Self::Good => "Good data quality",
      Self::Acceptable => "Acceptable data quality",
      Self::Revised => "Revised",
      Self::Preliminary => "Preliminary",
    }
  }
}

// ─── Geo-levels ──────────────────────────────────────────────────────────────

/// Geographic granularity of an area, as named in the `GEO_LEVEL` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum GeoLevel {
  Country,
  Province,
  Territory,
  CensusDivision,
  CensusSubdivision,
  CensusMetropolitanArea,
  CensusAgglomeration,
  TractedCensusAgglomeration,
  CensusMetropolitanAreaPart,
  CensusAgglomerationPart,
  CensusTract,
  AggregateDisseminationArea,
  DisseminationArea,
  DesignatedPlace,
  PopulationCentre,
  EconomicRegion,
  FederalElectoralDistrict,
  ForwardSortationArea,
  HealthRegion,
}

impl GeoLevel {
  pub fn name(self) -> &'static str {
    match self {
      Self::Country => "Country",
      Self::Province => "Province",
      Self::Territory => "Territory",
      Self::CensusDivision => "Census division",
      Self::CensusSubdivision => "Census subdivision",
      Self::CensusMetropolitanArea => "Census metropolitan area",
      Self::CensusAgglomeration => "Census agglomeration",
      Self::TractedCensusAgglomeration => "Tracted census agglomeration",
      Self::CensusMetropolitanAreaPart => "Census metropolitan area part",
      Self::CensusAgglomerationPart => "Census agglomeration part",
      Self::CensusTract => "Census tract",
      Self::AggregateDisseminationArea => "Aggregate dissemination area",
      Self::DisseminationArea => "Dissemination area",
      Self::DesignatedPlace => "Designated place",
      Self::PopulationCentre => "Population centre",
      Self::EconomicRegion => "Economic region",
      Self::FederalElectoralDistrict => {
        "Federal electoral district (2013 Representation Order)"
      }
      Self::ForwardSortationArea => "Forward sortation area",
      Self::HealthRegion => "Health region",
    }
  }
}

// ─── Areas ───────────────────────────────────────────────────────────────────

/// A persisted geographic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
  pub area_id:      i64,
  pub dguid:        String,
  pub alt_geo_code: String,
  pub geo_level_id: i64,
  pub name:         String,
}

/// The attributes used to create an area the first time its `dguid` is seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArea {
  pub alt_geo_code: String,
  pub geo_level_id: i64,
  pub name:         String,
}

impl NewArea {
  pub fn from_record(record: &CensusRecord, geo_level_id: i64) -> Self {
    Self {
      alt_geo_code: record.alt_geo_code.clone(),
      geo_level_id,
      name: record.geo_name.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn symbol_keys_and_descriptions_are_unique() {
    let reprs: HashSet<_> = Symbol::iter().map(Symbol::representation).collect();
    let descs: HashSet<_> = Symbol::iter().map(Symbol::description).collect();
    assert_eq!(reprs.len(), Symbol::iter().count());
    assert_eq!(descs.len(), Symbol::iter().count());
  }

  #[test]
  fn caution_symbol_is_a_capital_e() {
    assert_eq!(Symbol::UseWithCaution.representation(), "E");
    assert_eq!(Symbol::UseWithCaution.description(), "Use with caution");
  }

  #[test]
  fn geo_level_names_are_unique() {
    let names: HashSet<_> = GeoLevel::iter().map(GeoLevel::name).collect();
    assert_eq!(names.len(), GeoLevel::iter().count());
    assert_eq!(names.len(), 19);
  }
}
