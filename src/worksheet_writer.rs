//! Writes `xl/worksheets/sheet1.xml` to a temp file as CSV rows arrive.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::column::number_to_letters;
use crate::error::{ExcelError, Result};
use crate::temp_lease::TempFileLease;
use crate::xml_sanitize::sanitize;

const HEADER: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#;
const FOOTER: &[u8] = b"</sheetData></worksheet>";

/// Streams worksheet XML to a scoped temp file, one CSV row at a time.
///
/// Row numbers are assigned sequentially starting at 1; empty cells are
/// omitted entirely (sparse representation); every written value is always
/// an inline string, since no shared-string table is produced on the write
/// path. The leading-BOM strip from the first field of the first CSV row
/// happens upstream, in [`crate::csv::CsvRowStreamer`] — by the time a row
/// reaches this writer its fields are already clean.
pub struct WorksheetXmlWriter {
    lease: TempFileLease,
    file: File,
    row_number: i64,
}

impl WorksheetXmlWriter {
    pub fn create(temp_dir: &Path) -> Result<Self> {
        let (lease, file) = TempFileLease::create_in(temp_dir, "worksheet")?;
        let mut writer = Self {
            lease,
            file,
            row_number: 0,
        };
        write_all_checked(&mut writer.file, HEADER)?;
        Ok(writer)
    }

    /// Writes one row; returns the 1-based row number it was assigned.
    pub fn write_row(&mut self, fields: &[String]) -> Result<i64> {
        self.row_number += 1;
        let row_number = self.row_number;

        let mut xml = format!("<row r=\"{row_number}\">");
        for (i, field) in fields.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            let cell_ref = format!("{}{row_number}", number_to_letters((i + 1) as i64));
            let escaped = xml_escape(&sanitize(field));
            xml.push_str(&format!(
                "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{escaped}</t></is></c>"
            ));
        }
        xml.push_str("</row>");

        write_all_checked(&mut self.file, xml.as_bytes())?;
        Ok(row_number)
    }

    /// Closes out `</sheetData></worksheet>` and hands back the still-armed
    /// lease alongside its path: the caller reads the file back (e.g. to
    /// stream it into the output archive) and keeps the lease alive until
    /// that's done, so the temp file is still unlinked on every exit path.
    pub fn finish(mut self) -> Result<(TempFileLease, PathBuf)> {
        write_all_checked(&mut self.file, FOOTER)?;
        self.file.flush()?;
        let path = self.lease.path().to_path_buf();
        Ok((self.lease, path))
    }
}

/// A write loop that retries the remaining slice on a short write; a
/// zero-byte return is treated as a failure rather than looped on forever.
fn write_all_checked<W: Write>(writer: &mut W, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        let n = writer.write(buf)?;
        if n == 0 {
            return Err(ExcelError::WriteFailed(
                "zero-byte write while streaming worksheet XML".to_string(),
            ));
        }
        buf = &buf[n..];
    }
    Ok(())
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_xml(rows: &[Vec<String>]) -> String {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = WorksheetXmlWriter::create(dir.path()).unwrap();
        for row in rows {
            writer.write_row(row).unwrap();
        }
        let (_lease, path) = writer.finish().unwrap();
        std::fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn empty_cells_are_omitted() {
        let xml = finished_xml(&[vec!["a".to_string(), "".to_string(), "c".to_string()]]);
        assert!(xml.contains(r#"<c r="A1""#));
        assert!(!xml.contains(r#"<c r="B1""#));
        assert!(xml.contains(r#"<c r="C1""#));
    }

    #[test]
    fn rows_are_numbered_sequentially() {
        let xml = finished_xml(&[vec!["x".to_string()], vec!["y".to_string()]]);
        assert!(xml.contains(r#"<row r="1">"#));
        assert!(xml.contains(r#"<row r="2">"#));
    }

    #[test]
    fn cells_are_always_inline_strings() {
        let xml = finished_xml(&[vec!["hi".to_string()]]);
        assert!(xml.contains(r#"t="inlineStr""#));
        assert!(!xml.contains(r#"t="s""#));
    }

    #[test]
    fn entities_are_escaped() {
        let xml = finished_xml(&[vec!["<a> & \"b\" 'c'".to_string()]]);
        assert!(xml.contains("&lt;a&gt; &amp; &quot;b&quot; &apos;c&apos;"));
    }

    #[test]
    fn wraps_in_the_expected_envelope() {
        let xml = finished_xml(&[]);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.ends_with("</sheetData></worksheet>"));
    }
}
