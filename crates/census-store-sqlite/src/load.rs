//! Streaming fact loader.
//!
//! Lines are decoded one at a time. Closed-vocabulary references and the
//! characteristic are checked as each record is queued, so those errors carry
//! a line number and are never retried. Areas are resolved inside the batch
//! transaction, together with the fact inserts; a batch that fails is rolled
//! back, logged and retried once.

use std::{collections::HashSet, io::BufRead, mem};

use census_core::{
  dimension::NewArea,
  lines::RawLines,
  record::CensusRecord,
  store::{LoadOptions, LoadReport},
};
use rusqlite::Connection;

use crate::{Error, Result, resolve::Resolvers};

const INSERT_FACT: &str = "
INSERT INTO census (
    area_id, characteristic_id, tnr_sf, tnr_lf, data_quality_flag,
    c1_count_total, c1_count_total_symbol_id,
    c2_count_men,   c2_count_men_symbol_id,
    c3_count_women, c3_count_women_symbol_id,
    c10_rate_total, c10_rate_total_symbol_id,
    c11_rate_men,   c11_rate_men_symbol_id,
    c12_rate_women, c12_rate_women_symbol_id
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
ON CONFLICT (area_id, characteristic_id) DO NOTHING";

/// A decoded record whose closed-vocabulary references are resolved.
#[derive(Debug)]
struct PendingFact {
  record:  CensusRecord,
  area:    NewArea,
  /// Symbol ids in [`census_core::record::Measures::iter`] order.
  symbols: [Option<i64>; 6],
}

#[derive(Debug, Default)]
struct BatchOutcome {
  facts: usize,
  areas: usize,
}

/// Where a batch attempt failed. `index` is the fact being written, or
/// `None` if opening or committing the transaction failed.
struct BatchFailure {
  index: Option<usize>,
  error: Error,
}

pub(crate) struct FactLoader<'a> {
  conn:            &'a mut Connection,
  resolvers:       &'a mut Resolvers,
  characteristics: HashSet<i64>,
  batch:           Vec<PendingFact>,
  batch_size:      usize,
  report:          LoadReport,
}

impl<'a> FactLoader<'a> {
  pub fn new(
    conn: &'a mut Connection,
    resolvers: &'a mut Resolvers,
    source: &str,
    options: &LoadOptions,
  ) -> Result<Self> {
    let characteristics = conn
      .prepare("SELECT characteristic_id FROM characteristic")?
      .query_map([], |row| row.get(0))?
      .collect::<rusqlite::Result<HashSet<i64>>>()?;

    let batch_size = options.batch_size.max(1);
    Ok(Self {
      conn,
      resolvers,
      characteristics,
      batch: Vec::with_capacity(batch_size),
      batch_size,
      report: LoadReport { source: source.to_owned(), ..LoadReport::default() },
    })
  }

  pub fn run<R: BufRead>(mut self, reader: R, has_header: bool) -> Result<LoadReport> {
    tracing::info!(source = %self.report.source, batch_size = self.batch_size, "loading census extract");

    let mut lines = RawLines::new(reader);
    if has_header && let Some(header) = lines.next() {
      header?;
    }
    for raw in lines.by_ref() {
      let record = CensusRecord::decode(&raw?)?;
      self.push(record)?;
    }
    self.flush()?;
    self.report.lines_read = lines.lines_read();

    tracing::info!(
      source = %self.report.source,
      lines = self.report.lines_read,
      facts = self.report.facts_inserted,
      ignored = self.report.facts_ignored,
      areas = self.report.areas_inserted,
      batches = self.report.batches,
      "loaded census extract"
    );
    Ok(self.report)
  }

  fn push(&mut self, record: CensusRecord) -> Result<()> {
    let line = record.line;
    if !self.characteristics.contains(&record.characteristic_id) {
      return Err(Error::UnknownCharacteristic {
        line,
        characteristic_id: record.characteristic_id,
      });
    }

    let geo_level_id = self.resolvers.geo_level(self.conn, &record.geo_level, line)?;
    let mut symbols = [None; 6];
    for (slot, measure) in symbols.iter_mut().zip(record.measures.iter()) {
      *slot = self.resolvers.symbol(self.conn, measure.symbol.as_deref(), line)?;
    }

    let area = NewArea::from_record(&record, geo_level_id);
    self.batch.push(PendingFact { record, area, symbols });

    if self.batch.len() >= self.batch_size {
      self.flush()?;
    }
    Ok(())
  }

  fn flush(&mut self) -> Result<()> {
    if self.batch.is_empty() {
      return Ok(());
    }
    let batch = mem::take(&mut self.batch);
    let first_line = batch[0].record.line;
    let last_line = batch[batch.len() - 1].record.line;
    let number = self.report.batches + 1;

    let outcome = match self.apply(&batch) {
      Ok(outcome) => outcome,
      Err(BatchFailure { error: error @ Error::Database(_), index }) => {
        tracing::warn!(
          source = %self.report.source,
          batch = number,
          first_line,
          last_line,
          record = ?index.map(|i| &batch[i].record),
          %error,
          "batch failed, retrying once"
        );
        self.report.batches_retried += 1;

        match self.apply(&batch) {
          Ok(outcome) => outcome,
          Err(BatchFailure { error: Error::Database(source), index }) => {
            let row = match index {
              Some(i) => format!("line {} {:?}", batch[i].record.line, batch[i].record),
              None => "commit".to_owned(),
            };
            return Err(Error::BatchCommitFailure { first_line, last_line, row, source });
          }
          Err(BatchFailure { error, .. }) => return Err(error),
        }
      }
      Err(BatchFailure { error, .. }) => return Err(error),
    };

    self.report.batches += 1;
    self.report.facts_inserted += outcome.facts;
    self.report.facts_ignored += batch.len() - outcome.facts;
    self.report.areas_inserted += outcome.areas;
    tracing::debug!(
      source = %self.report.source,
      batch = number,
      first_line,
      last_line,
      facts = outcome.facts,
      areas = outcome.areas,
      "committed batch"
    );

    self.batch = batch;
    self.batch.clear();
    Ok(())
  }

  /// One attempt at writing `batch` atomically.
  fn apply(&mut self, batch: &[PendingFact]) -> Result<BatchOutcome, BatchFailure> {
    match write_batch(self.conn, self.resolvers, batch) {
      Ok(outcome) => {
        self.resolvers.areas.commit();
        Ok(outcome)
      }
      Err(failure) => {
        self.resolvers.areas.rollback();
        Err(failure)
      }
    }
  }
}

fn write_batch(
  conn: &mut Connection,
  resolvers: &mut Resolvers,
  batch: &[PendingFact],
) -> Result<BatchOutcome, BatchFailure> {
  let commit_failure = |e: rusqlite::Error| BatchFailure { index: None, error: e.into() };

  let tx = conn.transaction().map_err(commit_failure)?;
  let mut outcome = BatchOutcome::default();
  for (index, fact) in batch.iter().enumerate() {
    outcome.facts += insert_fact(&tx, resolvers, fact)
      .map_err(|error| BatchFailure { index: Some(index), error })?;
  }
  outcome.areas = resolvers.areas.pending();
  tx.commit().map_err(commit_failure)?;
  Ok(outcome)
}

fn insert_fact(conn: &Connection, resolvers: &mut Resolvers, fact: &PendingFact) -> Result<usize> {
  let record = &fact.record;
  let area_id = resolvers.area(conn, &record.dguid, &fact.area, record.line)?;
  let m = &record.measures;
  let s = &fact.symbols;

  let changes = conn.prepare_cached(INSERT_FACT)?.execute(rusqlite::params![
    area_id,
    record.characteristic_id,
    record.tnr_sf,
    record.tnr_lf,
    record.data_quality_flag,
    m.count_total.value,
    s[0],
    m.count_men.value,
    s[1],
    m.count_women.value,
    s[2],
    m.rate_total.value,
    s[3],
    m.rate_men.value,
    s[4],
    m.rate_women.value,
    s[5],
  ])?;
  Ok(changes)
}
