//! Streams `<row>` elements out of a worksheet XML body, resolving
//! shared-string and boolean cells, and emits them as dense CSV rows.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::column::column_from_cell_ref;
use crate::csv::CsvWriter;
use crate::error::Result;
use crate::shared_strings::SharedStringStore;

/// Forward-only, non-restartable reader over a worksheet's `<sheetData>`
/// rows.
pub struct RowStreamer<R: BufRead> {
    reader: Reader<R>,
}

impl<R: BufRead> RowStreamer<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);
        Self { reader }
    }

    /// Drives the whole stream to completion, writing one CSV line per
    /// XLSX row (including blank lines for any row numbers the sheet
    /// skipped over).
    pub fn stream_to_csv<W: Write>(
        mut self,
        sst: &mut SharedStringStore,
        csv: &mut CsvWriter<W>,
    ) -> Result<()> {
        let mut expected_row_number: i64 = 1;
        let mut buf = Vec::with_capacity(4096);

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                    let declared = declared_row_number(e, expected_row_number)?;
                    pad_blank_lines(csv, &mut expected_row_number, declared)?;
                    let row = self.read_row_body(sst)?;
                    csv.write_row(&row)?;
                    expected_row_number = declared + 1;
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                    let declared = declared_row_number(e, expected_row_number)?;
                    pad_blank_lines(csv, &mut expected_row_number, declared)?;
                    csv.write_row(&[])?;
                    expected_row_number = declared + 1;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(())
    }

    /// Reads a row's `<c>` children (at any depth under the row) into a
    /// dense, 1-indexed-turned-0-indexed vector sized to the row's maximum
    /// column.
    fn read_row_body(&mut self, sst: &mut SharedStringStore) -> Result<Vec<String>> {
        let mut cells: BTreeMap<i64, String> = BTreeMap::new();
        let mut max_column: i64 = 0;
        let mut current_column: i64 = 1;
        let mut buf = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"c" => {
                    let (col_attr, type_tag) = cell_attrs(e)?;
                    let col = col_attr.filter(|c| *c > 0).unwrap_or(current_column);
                    let raw = self.read_cell_text()?;
                    let value = resolve_cell_value(sst, type_tag.as_deref(), &raw)?;
                    cells.insert(col, value);
                    max_column = max_column.max(col);
                    current_column = col + 1;
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"c" => {
                    let (col_attr, type_tag) = cell_attrs(e)?;
                    let col = col_attr.filter(|c| *c > 0).unwrap_or(current_column);
                    let value = resolve_cell_value(sst, type_tag.as_deref(), "")?;
                    cells.insert(col, value);
                    max_column = max_column.max(col);
                    current_column = col + 1;
                }
                Event::End(ref e) if e.local_name().as_ref() == b"row" => break,
                Event::Eof => break,
                _ => {}
            }
        }

        let mut row = vec![String::new(); max_column.max(0) as usize];
        for (col, value) in cells {
            row[(col - 1) as usize] = value;
        }
        Ok(row)
    }

    /// Concatenates `<v>` text content and all `<t>` text content until the
    /// matching `</c>`, depth-aware (so `<is><t>…</t></is>` inline strings
    /// are read the same way as a plain `<v>`).
    fn read_cell_text(&mut self) -> Result<String> {
        let mut text = String::new();
        let mut capturing = false;
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local = e.local_name();
                    if local.as_ref() == b"v" || local.as_ref() == b"t" {
                        capturing = true;
                    }
                }
                Event::Text(ref e) if capturing => {
                    text.push_str(&e.unescape()?);
                }
                Event::End(ref e) => {
                    let local = e.local_name();
                    if local.as_ref() == b"v" || local.as_ref() == b"t" {
                        capturing = false;
                    } else if local.as_ref() == b"c" {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(text)
    }
}

fn declared_row_number(e: &BytesStart, fallback: i64) -> Result<i64> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"r" {
            let value = attr.unescape_value()?;
            if let Ok(n) = value.parse::<i64>() {
                if n > 0 {
                    return Ok(n);
                }
            }
            return Ok(fallback);
        }
    }
    Ok(fallback)
}

fn cell_attrs(e: &BytesStart) -> Result<(Option<i64>, Option<String>)> {
    let mut col = None;
    let mut type_tag = None;
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"r" => {
                let value = attr.unescape_value()?;
                col = column_from_cell_ref(&value);
            }
            b"t" => {
                let value = attr.unescape_value()?;
                type_tag = Some(value.into_owned());
            }
            _ => {}
        }
    }
    Ok((col, type_tag))
}

/// Resolves a cell's raw textual content to its final CSV field value based
/// on the `t` attribute: a shared-string index is looked up, a boolean `0`/`1`
/// becomes `FALSE`/`TRUE`, and everything else (inline strings, numbers, an
/// absent tag) passes through verbatim.
fn resolve_cell_value(
    sst: &mut SharedStringStore,
    type_tag: Option<&str>,
    raw: &str,
) -> Result<String> {
    match type_tag {
        Some("s") => match raw.trim().parse::<usize>() {
            Ok(index) => sst.get(index),
            Err(_) => {
                log::warn!("shared-string cell has non-numeric index '{raw}', treating as empty");
                Ok(String::new())
            }
        },
        Some("b") => Ok(if raw.trim() == "1" { "TRUE" } else { "FALSE" }.to_string()),
        // `inlineStr` and any unrecognized/absent tag both just want the
        // already-accumulated <v>/<t> text verbatim.
        Some(other) if other != "inlineStr" => {
            log::warn!("cell has unrecognized type tag '{other}', treating value as plain text");
            Ok(raw.to_string())
        }
        _ => Ok(raw.to_string()),
    }
}

fn pad_blank_lines<W: Write>(
    csv: &mut CsvWriter<W>,
    expected_row_number: &mut i64,
    declared: i64,
) -> Result<()> {
    if *expected_row_number < declared {
        log::warn!(
            "worksheet skips from row {expected_row_number} to row {declared}, padding with blank lines"
        );
    }
    while *expected_row_number < declared {
        csv.write_blank_line()?;
        *expected_row_number += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn run(xml: &str) -> String {
        let mut sst = SharedStringStore::null();
        let mut out = Vec::new();
        {
            let mut csv = CsvWriter::new(&mut out);
            let streamer = RowStreamer::new(BufReader::new(xml.as_bytes()));
            streamer.stream_to_csv(&mut sst, &mut csv).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    fn run_with_sst(xml: &str, strings: &[&str]) -> String {
        let sst_xml = strings
            .iter()
            .map(|s| format!("<si><t>{s}</t></si>"))
            .collect::<String>();
        let dir = tempfile::tempdir().unwrap();
        let mut sst = crate::shared_strings::SharedStringStoreBuilder::build(
            format!("<sst>{sst_xml}</sst>").as_bytes(),
            dir.path(),
        )
        .unwrap();

        let mut out = Vec::new();
        {
            let mut csv = CsvWriter::new(&mut out);
            let streamer = RowStreamer::new(BufReader::new(xml.as_bytes()));
            streamer.stream_to_csv(&mut sst, &mut csv).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sparse_rows_fill_gaps_with_blank_lines() {
        let xml = r#"<sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>a</t></is></c><c r="B1" t="inlineStr"><is><t>b</t></is></c></row>
            <row r="3"><c r="B3" t="inlineStr"><is><t>b3</t></is></c></row>
        </sheetData>"#;
        assert_eq!(run(xml), "a,b\n\n,b3\n");
    }

    #[test]
    fn boolean_cells_become_true_false() {
        let xml = r#"<sheetData><row r="1"><c r="A1" t="b"><v>1</v></c><c r="B1" t="b"><v>0</v></c></row></sheetData>"#;
        assert_eq!(run(xml), "TRUE,FALSE\n");
    }

    #[test]
    fn shared_string_cells_resolve_by_index() {
        let xml = r#"<sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>2</v></c><c r="C1" t="s"><v>1</v></c></row></sheetData>"#;
        assert_eq!(run_with_sst(xml, &["foo", "bar", "baz"]), "foo,baz,bar\n");
    }

    #[test]
    fn missing_row_attribute_falls_back_to_counter() {
        let xml = r#"<sheetData><row><c><v>1</v></c><c><v>2</v></c></row></sheetData>"#;
        assert_eq!(run(xml), "1,2\n");
    }

    #[test]
    fn empty_self_closing_row_is_a_blank_line() {
        let xml = r#"<sheetData><row r="1"/><row r="2"><c r="A2"><v>x</v></c></row></sheetData>"#;
        assert_eq!(run(xml), "\nx\n");
    }
}
