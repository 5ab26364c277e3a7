//! Writes CSV rows with `,` as the fixed output delimiter and LF line
//! endings, regardless of what delimiter the source used.

use std::io::Write;

use crate::error::Result;

use super::dialect::encode_row;

pub struct CsvWriter<W: Write> {
    inner: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one dense row, comma-delimited, LF-terminated.
    pub fn write_row(&mut self, fields: &[String]) -> Result<()> {
        let line = encode_row(fields, b',');
        self.inner.write_all(&line)?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    /// Writes a bare newline — used to fill gaps between non-contiguous
    /// XLSX row numbers so CSV line N still corresponds to XLSX row N.
    pub fn write_blank_line(&mut self) -> Result<()> {
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_row_and_blank_lines() {
        let mut buf = Vec::new();
        {
            let mut writer = CsvWriter::new(&mut buf);
            writer.write_row(&["a".to_string(), "b".to_string()]).unwrap();
            writer.write_blank_line().unwrap();
            writer.write_row(&["c".to_string()]).unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "a,b\n\nc\n");
    }
}
