//! Delimiter inference and the forward-only CSV row reader used on the
//! CSV → XLSX path.

use std::io::{BufRead, Read, Seek, SeekFrom};

use crate::error::Result;
use crate::xml_sanitize::sanitize_bytes;

use super::dialect::{parse_record, strip_bom, CANDIDATE_DELIMITERS, QUOTE};

/// Scans for the first non-blank line, tries each candidate delimiter
/// against it, and returns whichever produces the most fields (earliest
/// candidate wins ties). Defaults to `,` when the input has no non-blank
/// line. Rewinds `reader` to offset 0 before returning, regardless of
/// outcome, so actual parsing starts from the beginning.
pub fn detect_delimiter<R: Read + Seek>(reader: &mut R) -> Result<u8> {
    let first_line = read_first_non_blank_line(reader)?;
    reader.seek(SeekFrom::Start(0))?;

    let Some(line) = first_line else {
        return Ok(b',');
    };

    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0usize;
    for &delimiter in CANDIDATE_DELIMITERS.iter() {
        let count = parse_record(&line, delimiter).len();
        if count > best_count {
            best_count = count;
            best = delimiter;
        }
    }
    Ok(best)
}

fn read_first_non_blank_line<R: Read>(reader: &mut R) -> Result<Option<String>> {
    loop {
        let mut raw = Vec::new();
        let mut byte = [0u8; 1];
        let mut saw_any_byte = false;
        loop {
            let n = reader.read(&mut byte)?;
            if n == 0 {
                break;
            }
            saw_any_byte = true;
            if byte[0] == b'\n' {
                break;
            }
            raw.push(byte[0]);
        }

        if !saw_any_byte && raw.is_empty() {
            return Ok(None);
        }

        let stripped = strip_bom(&raw);
        let text = String::from_utf8_lossy(stripped);
        let trimmed = text.trim_end_matches('\r');
        if !trimmed.trim().is_empty() {
            return Ok(Some(trimmed.to_string()));
        }
        if !saw_any_byte {
            return Ok(None);
        }
    }
}

/// Forward-only reader that yields dense CSV rows, reassembling records
/// whose quoted fields span multiple physical lines.
///
/// The very first field of the very first row has a leading UTF-8 BOM
/// stripped exactly once. Bytes are read without assuming valid UTF-8:
/// invalid sequences are dropped and the rest is XML-sanitized on the way
/// out, rather than failing the whole conversion.
pub struct CsvRowStreamer<R: BufRead> {
    reader: R,
    delimiter: u8,
    first_row: bool,
}

impl<R: BufRead> CsvRowStreamer<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        Self {
            reader,
            delimiter,
            first_row: true,
        }
    }

    /// Returns the next row, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        let Some(record) = self.read_logical_record()? else {
            return Ok(None);
        };

        let mut fields = parse_record(&record, self.delimiter);
        if self.first_row {
            self.first_row = false;
            if let Some(first) = fields.first_mut() {
                let stripped = strip_bom(first.as_bytes());
                *first = String::from_utf8_lossy(stripped).into_owned();
            }
        }
        Ok(Some(fields))
    }

    fn read_logical_record(&mut self) -> Result<Option<String>> {
        let mut record: Vec<u8> = Vec::new();
        let mut saw_any_line = false;

        loop {
            let mut line = Vec::new();
            let n = self.reader.read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            saw_any_line = true;

            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }

            if !record.is_empty() {
                record.push(b'\n');
            }
            record.extend_from_slice(&line);

            if count_quotes(&record) % 2 == 0 {
                break;
            }
            // odd quote count: we're mid-quoted-field, keep reading lines
        }

        if !saw_any_line {
            Ok(None)
        } else {
            // Bytes are never assumed to be valid UTF-8 here: invalid
            // sequences are dropped rather than failing the conversion.
            Ok(Some(sanitize_bytes(&record)))
        }
    }
}

fn count_quotes(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == QUOTE).count()
}
