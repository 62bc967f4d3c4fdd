//! Reconstruction of the characteristic tree from indentation.
//!
//! Each source entry carries an id and a fragment whose leading run of
//! two-space units gives its depth. The entries form a pre-order walk of the
//! tree, so the ancestors of the current entry are exactly the entries on a
//! stack truncated to the current depth.
//!
//! A single physical file may repeat the list (regional extracts carry it
//! once per area); the first id that does not increase ends the pass.

use std::io::BufRead;

use crate::{
  Error, Result,
  characteristic::Characteristic,
  lines::{self, RawLines},
  record::CensusRecord,
};

/// Joins ancestor fragments into a full description.
pub const SEPARATOR: &str = "; ";

/// Columns in the characteristic reference extract.
pub const REFERENCE_ARITY: usize = 2;

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One (id, indented fragment) pair, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyEntry {
  pub line:     usize,
  pub id:       i64,
  /// Fragment with its indentation intact.
  pub fragment: String,
  pub note:     Option<String>,
}

/// Entries of the two-column reference extract. A trailing ` (N)` footnote
/// marker on a fragment becomes the note.
pub fn reference_entries<R: BufRead>(
  reader: R,
) -> impl Iterator<Item = Result<HierarchyEntry>> {
  RawLines::new(reader).map(|raw| {
    let raw = raw?;
    let text = raw.decode()?;
    let fields = lines::split_fields(&text, REFERENCE_ARITY, raw.number)?;
    let id = fields[0].trim().parse().map_err(|_| Error::MalformedRecord {
      line:   raw.number,
      reason: format!("characteristic id is not numeric: {:?}", fields[0]),
    })?;
    let (fragment, footnote) = strip_footnote(fields[1]);

    Ok(HierarchyEntry {
      line: raw.number,
      id,
      fragment: fragment.to_owned(),
      note: footnote.map(str::to_owned),
    })
  })
}

/// Entries taken from the characteristic columns of a regional census
/// extract. The note comes from `CHARACTERISTIC_NOTE`, falling back to a
/// footnote marker on the name.
pub fn census_entries<R: BufRead>(
  reader: R,
  has_header: bool,
) -> impl Iterator<Item = Result<HierarchyEntry>> {
  RawLines::new(reader)
    .skip(usize::from(has_header))
    .map(|raw| {
      let record = CensusRecord::decode(&raw?)?;
      let (fragment, footnote) = strip_footnote(&record.characteristic_name);

      Ok(HierarchyEntry {
        line:     record.line,
        id:       record.characteristic_id,
        fragment: fragment.to_owned(),
        note:     record
          .characteristic_note
          .or_else(|| footnote.map(str::to_owned)),
      })
    })
}

/// Split a trailing whitespace + `(digits)` footnote marker off a fragment.
pub fn strip_footnote(fragment: &str) -> (&str, Option<&str>) {
  if let Some(body) = fragment.strip_suffix(')')
    && let Some(open) = body.rfind('(')
  {
    let (head, digits) = (&body[..open], &body[open + 1..]);
    if !digits.is_empty()
      && digits.bytes().all(|b| b.is_ascii_digit())
      && let Some(space) = head.chars().next_back()
      && space.is_whitespace()
    {
      return (&head[..head.len() - space.len_utf8()], Some(digits));
    }
  }
  (fragment, None)
}

/// Depth of a fragment: its leading spaces divided by two.
pub fn indent_depth(fragment: &str, line: usize) -> Result<usize> {
  let spaces = fragment.bytes().take_while(|b| *b == b' ').count();
  if spaces % 2 != 0 {
    return Err(Error::HierarchyFormatViolation {
      line,
      fragment: fragment.to_owned(),
      reason: format!("odd indentation of {spaces} spaces"),
    });
  }
  Ok(spaces / 2)
}

// ─── State machine ───────────────────────────────────────────────────────────

/// Outcome of feeding one entry to the [`Reconstructor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  Node(Characteristic),
  /// The id did not increase; the block is complete.
  End,
}

/// The active ancestor chain.
#[derive(Debug, Default)]
pub struct Reconstructor {
  stack:   Vec<(i64, String)>,
  last_id: Option<i64>,
}

impl Reconstructor {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, entry: HierarchyEntry) -> Result<Step> {
    if let Some(last) = self.last_id
      && entry.id <= last
    {
      tracing::debug!(line = entry.line, id = entry.id, last, "characteristic block complete");
      return Ok(Step::End);
    }

    let depth = indent_depth(&entry.fragment, entry.line)?;
    let fragment = entry.fragment.trim();
    if fragment.contains(SEPARATOR.trim_end()) {
      return Err(Error::HierarchyFormatViolation {
        line:     entry.line,
        fragment: entry.fragment.clone(),
        reason:   format!("fragment contains the separator {SEPARATOR:?}"),
      });
    }

    self.stack.truncate(depth);
    self.stack.push((entry.id, fragment.to_owned()));
    self.last_id = Some(entry.id);

    Ok(Step::Node(Characteristic {
      characteristic_id: entry.id,
      description:       self.full_description(),
      note:              entry.note,
      parent_id:         self.parent_id(),
    }))
  }

  /// The fragments on the stack, root first.
  pub fn full_description(&self) -> String {
    self
      .stack
      .iter()
      .map(|(_, fragment)| fragment.as_str())
      .collect::<Vec<_>>()
      .join(SEPARATOR)
  }

  pub fn parent_id(&self) -> Option<i64> {
    self
      .stack
      .len()
      .checked_sub(2)
      .map(|index| self.stack[index].0)
  }
}

/// Iterator adapter returned by [`reconstruct`].
pub struct Reconstruct<I> {
  entries: I,
  state:   Reconstructor,
  done:    bool,
}

impl<I> Iterator for Reconstruct<I>
where
  I: Iterator<Item = Result<HierarchyEntry>>,
{
  type Item = Result<Characteristic>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    let step = self
      .entries
      .next()
      .map(|entry| entry.and_then(|entry| self.state.push(entry)));

    match step {
      Some(Ok(Step::Node(characteristic))) => Some(Ok(characteristic)),
      Some(Err(e)) => {
        self.done = true;
        Some(Err(e))
      }
      Some(Ok(Step::End)) | None => {
        self.done = true;
        None
      }
    }
  }
}

/// Reconstruct characteristics from `entries`, stopping at the first id that
/// does not increase or at the first error.
pub fn reconstruct<I>(entries: I) -> Reconstruct<I::IntoIter>
where
  I: IntoIterator<Item = Result<HierarchyEntry>>,
{
  Reconstruct {
    entries: entries.into_iter(),
    state:   Reconstructor::new(),
    done:    false,
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  fn entry(id: i64, fragment: &str) -> Result<HierarchyEntry> {
    Ok(HierarchyEntry {
      line: id as usize,
      id,
      fragment: fragment.to_owned(),
      note: None,
    })
  }

  #[test]
  fn joins_the_ancestor_chain() {
    let out: Vec<Characteristic> = reconstruct([
      entry(1, "Total"),
      entry(2, "  Owner"),
      entry(3, "    With mortgage"),
    ])
    .collect::<Result<_>>()
    .unwrap();

    assert_eq!(out[2].description, "Total; Owner; With mortgage");
    assert_eq!(out[2].parent_id, Some(2));
    assert_eq!(out[1].parent_id, Some(1));
    assert_eq!(out[0].parent_id, None);
  }

  #[test]
  fn siblings_and_dedent_truncate_the_stack() {
    let out: Vec<Characteristic> = reconstruct([
      entry(1, "Total"),
      entry(2, "  Owner"),
      entry(3, "    With mortgage"),
      entry(4, "  Renter"),
      entry(5, "Median"),
      entry(6, "  Owner"),
    ])
    .collect::<Result<_>>()
    .unwrap();

    assert_eq!(out[3].description, "Total; Renter");
    assert_eq!(out[3].parent_id, Some(1));
    assert_eq!(out[4].description, "Median");
    assert_eq!(out[4].parent_id, None);
    assert_eq!(out[5].description, "Median; Owner");
    assert_eq!(out[5].parent_id, Some(5));
  }

  #[test]
  fn stops_when_ids_stop_increasing() {
    let out: Vec<Characteristic> = reconstruct([
      entry(1, "Total"),
      entry(2, "  Owner"),
      entry(1, "Total"),
      entry(2, "  Owner"),
    ])
    .collect::<Result<_>>()
    .unwrap();

    assert_eq!(out.len(), 2);
  }

  #[test]
  fn odd_indentation_is_fatal() {
    let err = reconstruct([entry(1, "Total"), entry(2, "   Owner")])
      .collect::<Result<Vec<_>>>()
      .unwrap_err();

    assert!(matches!(err, Error::HierarchyFormatViolation { line: 2, .. }));
  }

  #[test]
  fn separator_in_fragment_is_fatal() {
    let err = reconstruct([entry(1, "Total; all")])
      .collect::<Result<Vec<_>>>()
      .unwrap_err();

    assert!(matches!(err, Error::HierarchyFormatViolation { .. }));
  }

  #[test]
  fn strips_footnote_markers() {
    assert_eq!(strip_footnote("Population, 2021 (1)"), ("Population, 2021", Some("1")));
    assert_eq!(strip_footnote("  Median age (12)"), ("  Median age", Some("12")));
    assert_eq!(strip_footnote("Owner (x)"), ("Owner (x)", None));
    assert_eq!(strip_footnote("Total(3)"), ("Total(3)", None));
    assert_eq!(strip_footnote("(5)"), ("(5)", None));
  }

  #[test]
  fn reads_the_reference_extract() {
    let input = b"1\tTotal (1)\n2\t  Owner\r\n3\t    With mortgage (2)\n1\tTotal\n".to_vec();
    let out: Vec<Characteristic> = reconstruct(reference_entries(Cursor::new(input)))
      .collect::<Result<_>>()
      .unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].description, "Total");
    assert_eq!(out[0].note.as_deref(), Some("1"));
    assert_eq!(out[2].description, "Total; Owner; With mortgage");
    assert_eq!(out[2].note.as_deref(), Some("2"));
  }

  #[test]
  fn reference_extract_with_bad_id_is_malformed() {
    let input = b"one\tTotal\n".to_vec();
    let err = reconstruct(reference_entries(Cursor::new(input)))
      .collect::<Result<Vec<_>>>()
      .unwrap_err();

    assert!(matches!(err, Error::MalformedRecord { line: 1, .. }));
  }
}
