//! Decoding of regional census extract lines into [`CensusRecord`]s.

use crate::{
  Error, Result,
  lines::{self, RawLine},
};

/// Number of tab-separated fields on every census extract line.
pub const CENSUS_ARITY: usize = 23;

// ─── Column positions ────────────────────────────────────────────────────────

pub mod column {
  pub const CENSUS_YEAR: usize = 0;
  pub const DGUID: usize = 1;
  pub const ALT_GEO_CODE: usize = 2;
  pub const GEO_LEVEL: usize = 3;
  pub const GEO_NAME: usize = 4;
  pub const TNR_SF: usize = 5;
  pub const TNR_LF: usize = 6;
  pub const DATA_QUALITY_FLAG: usize = 7;
  pub const CHARACTERISTIC_ID: usize = 8;
  pub const CHARACTERISTIC_NAME: usize = 9;
  pub const CHARACTERISTIC_NOTE: usize = 10;
  pub const C1_COUNT_TOTAL: usize = 11;
  pub const C2_COUNT_MEN: usize = 13;
  pub const C3_COUNT_WOMEN: usize = 15;
  pub const C10_RATE_TOTAL: usize = 17;
  pub const C11_RATE_MEN: usize = 19;
  pub const C12_RATE_WOMEN: usize = 21;
}

// ─── Types ───────────────────────────────────────────────────────────────────

/// One value column and the symbol column that annotates it.
///
/// `value` is absent whenever the source left it empty, which is the case
/// when the symbol marks the value as unavailable or suppressed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measure {
  pub value:  Option<f64>,
  pub symbol: Option<String>,
}

/// The six value groups carried by each record, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measures {
  pub count_total: Measure,
  pub count_men:   Measure,
  pub count_women: Measure,
  pub rate_total:  Measure,
  pub rate_men:    Measure,
  pub rate_women:  Measure,
}

impl Measures {
  /// Iterate the groups in column order.
  pub fn iter(&self) -> impl Iterator<Item = &Measure> {
    [
      &self.count_total,
      &self.count_men,
      &self.count_women,
      &self.rate_total,
      &self.rate_men,
      &self.rate_women,
    ]
    .into_iter()
  }
}

/// A fully decoded census extract line.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusRecord {
  /// 1-based line number in the source file.
  pub line:                usize,
  pub census_year:         i32,
  pub dguid:               String,
  pub alt_geo_code:        String,
  pub geo_level:           String,
  pub geo_name:            String,
  pub tnr_sf:              f64,
  pub tnr_lf:              f64,
  pub data_quality_flag:   String,
  pub characteristic_id:   i64,
  pub characteristic_name: String,
  pub characteristic_note: Option<String>,
  pub measures:            Measures,
}

// ─── Decoding ────────────────────────────────────────────────────────────────

impl CensusRecord {
  /// Decode and split one raw line.
  pub fn decode(raw: &RawLine) -> Result<Self> {
    let text = raw.decode()?;
    let fields = lines::split_fields(&text, CENSUS_ARITY, raw.number)?;
    let line = raw.number;
    let parser = FieldParser { fields: &fields, line };

    Ok(Self {
      line,
      census_year: parser.required("CENSUS_YEAR", column::CENSUS_YEAR)?,
      dguid: parser.key("DGUID", column::DGUID)?,
      alt_geo_code: parser.key("ALT_GEO_CODE", column::ALT_GEO_CODE)?,
      geo_level: parser.key("GEO_LEVEL", column::GEO_LEVEL)?,
      geo_name: parser.label("GEO_NAME", column::GEO_NAME)?,
      tnr_sf: parser.required("TNR_SF", column::TNR_SF)?,
      tnr_lf: parser.required("TNR_LF", column::TNR_LF)?,
      data_quality_flag: parser
        .label("DATA_QUALITY_FLAG", column::DATA_QUALITY_FLAG)?,
      characteristic_id: parser
        .required("CHARACTERISTIC_ID", column::CHARACTERISTIC_ID)?,
      characteristic_name: parser.text(column::CHARACTERISTIC_NAME),
      characteristic_note: lines::optional(&fields[column::CHARACTERISTIC_NOTE])
        .map(str::to_owned),
      measures: Measures {
        count_total: parser.measure("C1_COUNT_TOTAL", column::C1_COUNT_TOTAL)?,
        count_men:   parser.measure("C2_COUNT_MEN+", column::C2_COUNT_MEN)?,
        count_women: parser.measure("C3_COUNT_WOMEN+", column::C3_COUNT_WOMEN)?,
        rate_total:  parser.measure("C10_RATE_TOTAL", column::C10_RATE_TOTAL)?,
        rate_men:    parser.measure("C11_RATE_MEN+", column::C11_RATE_MEN)?,
        rate_women:  parser.measure("C12_RATE_WOMEN+", column::C12_RATE_WOMEN)?,
      },
    })
  }
}

struct FieldParser<'a> {
  fields: &'a [&'a str],
  line:   usize,
}

impl FieldParser<'_> {
  fn text(&self, index: usize) -> String { self.fields[index].to_owned() }

  /// Required text kept verbatim; blank is malformed.
  fn label(&self, name: &str, index: usize) -> Result<String> {
    if self.fields[index].trim().is_empty() {
      return Err(Error::malformed(self.line, format!("{name} is empty")));
    }
    Ok(self.text(index))
  }

  /// Natural-key columns: trimmed and never empty.
  fn key(&self, name: &str, index: usize) -> Result<String> {
    let value = self.fields[index].trim();
    if value.is_empty() {
      return Err(Error::malformed(self.line, format!("{name} is empty")));
    }
    Ok(value.to_owned())
  }

  fn required<T: std::str::FromStr>(&self, name: &str, index: usize) -> Result<T> {
    let raw = self.fields[index].trim();
    if raw.is_empty() {
      return Err(Error::malformed(self.line, format!("{name} is empty")));
    }
    raw.parse().map_err(|_| {
      Error::malformed(self.line, format!("{name} is not numeric: {raw:?}"))
    })
  }

  /// A value column at `index` followed by its symbol column.
  fn measure(&self, name: &str, index: usize) -> Result<Measure> {
    let value = match lines::optional(self.fields[index].trim()) {
      Some(raw) => Some(raw.parse::<f64>().map_err(|_| {
        Error::malformed(self.line, format!("{name} is not numeric: {raw:?}"))
      })?),
      None => None,
    };
    let symbol = lines::symbol(self.fields[index + 1]).map(str::to_owned);
    Ok(Measure { value, symbol })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(text: &str) -> RawLine {
    RawLine { number: 3, bytes: text.as_bytes().to_vec() }
  }

  const LINE: &str = "2021\t2021A000011124\t01\tCountry\tCanada\t4.0\t2.8\t20000\t1\tPopulation, 2021\t1\t36991981\t\t\t...\t\t...\t\t\t\t\t\t";

  #[test]
  fn decodes_a_full_line() {
    let record = CensusRecord::decode(&raw(LINE)).unwrap();

    assert_eq!(record.line, 3);
    assert_eq!(record.census_year, 2021);
    assert_eq!(record.dguid, "2021A000011124");
    assert_eq!(record.alt_geo_code, "01");
    assert_eq!(record.geo_level, "Country");
    assert_eq!(record.tnr_sf, 4.0);
    assert_eq!(record.tnr_lf, 2.8);
    assert_eq!(record.data_quality_flag, "20000");
    assert_eq!(record.characteristic_id, 1);
    assert_eq!(record.characteristic_note.as_deref(), Some("1"));
    assert_eq!(record.measures.count_total.value, Some(36_991_981.0));
    assert_eq!(record.measures.count_total.symbol, None);
    assert_eq!(record.measures.count_men.value, None);
    assert_eq!(record.measures.count_men.symbol.as_deref(), Some("..."));
    assert_eq!(record.measures.rate_women, Measure::default());
  }

  #[test]
  fn wrong_field_count_is_malformed() {
    let short = LINE.rsplit_once('\t').unwrap().0;
    let long = format!("{LINE}\textra");

    for text in [short, long.as_str()] {
      let err = CensusRecord::decode(&raw(text)).unwrap_err();
      assert!(matches!(err, Error::MalformedRecord { line: 3, .. }), "{err}");
    }
  }

  #[test]
  fn non_numeric_value_is_malformed() {
    let text = LINE.replace("36991981", "lots");
    let err = CensusRecord::decode(&raw(&text)).unwrap_err();
    assert!(err.to_string().contains("C1_COUNT_TOTAL"));
  }

  #[test]
  fn blank_required_text_is_malformed() {
    let no_flag = LINE.replace("\t20000\t", "\t\t");
    let no_name = LINE.replace("\tCanada\t", "\t \t");

    for (text, column) in [(no_flag, "DATA_QUALITY_FLAG"), (no_name, "GEO_NAME")] {
      let err = CensusRecord::decode(&raw(&text)).unwrap_err();
      assert!(matches!(err, Error::MalformedRecord { line: 3, .. }), "{err}");
      assert!(err.to_string().contains(column), "{err}");
    }
  }

  #[test]
  fn symbol_columns_are_trimmed() {
    let text = LINE.replacen("36991981\t\t", "36991981\t E \t", 1);
    let record = CensusRecord::decode(&raw(&text)).unwrap();
    assert_eq!(record.measures.count_total.symbol.as_deref(), Some("E"));
  }
}
