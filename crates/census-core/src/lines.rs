//! Byte-level line reading for the tab-separated extracts.
//!
//! Extracts are published in a legacy single-byte charset and can run to
//! several gigabytes, so lines are pulled one at a time as raw bytes and only
//! decoded to UTF-8 once they are needed.

use std::{borrow::Cow, io::BufRead};

use encoding_rs::WINDOWS_1252;

use crate::{Error, Result};

/// Column delimiter used by every extract.
pub const DELIMITER: char = '\t';

/// One physical line of an extract, still in its source encoding and with the
/// line terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
  /// 1-based position in the file.
  pub number: usize,
  pub bytes:  Vec<u8>,
}

impl RawLine {
  /// Decode the line from Latin-1 to UTF-8.
  ///
  /// Bytes are read as Windows-1252, so 0x80..=0x9F become the printable
  /// characters the extracts mean by them (`\x96` is `–`) rather than C1
  /// control codes.
  pub fn decode(&self) -> Result<Cow<'_, str>> {
    WINDOWS_1252
      .decode_without_bom_handling_and_without_replacement(&self.bytes)
      .ok_or_else(|| Error::malformed(self.number, "undecodable byte sequence"))
  }
}

/// Iterator over the [`RawLine`]s of a reader.
pub struct RawLines<R> {
  reader: R,
  number: usize,
}

impl<R: BufRead> RawLines<R> {
  pub fn new(reader: R) -> Self { Self { reader, number: 0 } }

  /// Number of lines yielded so far.
  pub fn lines_read(&self) -> usize { self.number }
}

impl<R: BufRead> Iterator for RawLines<R> {
  type Item = Result<RawLine>;

  fn next(&mut self) -> Option<Self::Item> {
    let mut bytes = Vec::new();
    match self.reader.read_until(b'\n', &mut bytes) {
      Ok(0) => None,
      Ok(_) => {
        self.number += 1;
        strip_terminator(&mut bytes);
        Some(Ok(RawLine { number: self.number, bytes }))
      }
      Err(e) => Some(Err(e.into())),
    }
  }
}

fn strip_terminator(bytes: &mut Vec<u8>) {
  if bytes.last() == Some(&b'\n') {
    bytes.pop();
    if bytes.last() == Some(&b'\r') {
      bytes.pop();
    }
  }
}

/// Split a decoded line into exactly `arity` fields.
pub fn split_fields(text: &str, arity: usize, line: usize) -> Result<Vec<&str>> {
  let fields: Vec<&str> = text.split(DELIMITER).collect();
  if fields.len() != arity {
    return Err(Error::malformed(
      line,
      format!("expected {arity} fields, found {}", fields.len()),
    ));
  }
  Ok(fields)
}

/// Empty text columns are logically absent.
pub fn optional(field: &str) -> Option<&str> {
  if field.is_empty() { None } else { Some(field) }
}

/// Symbol-like columns are trimmed before the emptiness check.
pub fn symbol(field: &str) -> Option<&str> { optional(field.trim()) }

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;

  #[test]
  fn strips_line_terminators() {
    let lines: Vec<RawLine> = RawLines::new(Cursor::new(b"a\tb\r\nc\n\nd".to_vec()))
      .collect::<Result<_>>()
      .unwrap();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].bytes, b"a\tb");
    assert_eq!(lines[1].bytes, b"c");
    assert!(lines[2].bytes.is_empty());
    assert_eq!(lines[3].bytes, b"d");
    assert_eq!(lines[3].number, 4);
  }

  #[test]
  fn decodes_latin1_bytes() {
    let line = RawLine { number: 1, bytes: b"Qu\xe9bec".to_vec() };
    assert_eq!(line.decode().unwrap(), "Québec");

    let dash = RawLine { number: 2, bytes: b"a\x96b".to_vec() };
    assert_eq!(dash.decode().unwrap(), "a\u{2013}b");
  }

  #[test]
  fn split_rejects_wrong_arity() {
    assert_eq!(split_fields("a\tb\tc", 3, 1).unwrap(), ["a", "b", "c"]);

    let err = split_fields("a\tb", 3, 7).unwrap_err();
    assert!(matches!(err, Error::MalformedRecord { line: 7, .. }));
  }

  #[test]
  fn empty_and_blank_fields() {
    assert_eq!(optional(""), None);
    assert_eq!(optional(" x "), Some(" x "));
    assert_eq!(symbol("  "), None);
    assert_eq!(symbol(" E "), Some("E"));
  }
}
