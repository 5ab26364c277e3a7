//! Disk-backed shared-string table: a data file of length-prefixed UTF-8
//! records plus a fixed-width index file enabling O(1) random lookup.
//!
//! The table is built once, up front, by streaming `xl/sharedStrings.xml`
//! (never holding more than one string's bytes in memory at a time), and is
//! then queried by index as the worksheet is streamed. Neither file nor the
//! lookup path ever materializes the full table as owned `String`s.

use std::fs::File;
use std::io::{BufRead, Read, Seek, SeekFrom, Write};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ExcelError, Result};
use crate::temp_lease::TempFileLease;

/// Length of one index record: 20 ASCII decimal digits + one `0x0A`
/// separator byte. The separator is a real newline byte, never the
/// two-character escape sequence `\` + `n` — see the design notes on why
/// that ambiguity matters for the seek stride.
const INDEX_RECORD_LEN: u64 = 21;

/// The disk-backed shared-string store. `SharedStringStore::null()` is the
/// legal "no `xl/sharedStrings.xml` part" case: no `s`-typed cells are
/// expected, and any lookup against it is a hard failure rather than a
/// tolerated gap.
pub struct SharedStringStore {
    index_file: Option<File>,
    data_file: Option<File>,
    len: usize,
    _index_lease: Option<TempFileLease>,
    _data_lease: Option<TempFileLease>,
}

impl SharedStringStore {
    pub fn null() -> Self {
        Self {
            index_file: None,
            data_file: None,
            len: 0,
            _index_lease: None,
            _data_lease: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index_file.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Looks up shared string `i`. A missing store is a hard failure; an
    /// out-of-range index or a truncated record tolerantly yields `""`.
    pub fn get(&mut self, i: usize) -> Result<String> {
        let (Some(index_file), Some(data_file)) = (self.index_file.as_mut(), self.data_file.as_mut())
        else {
            return Err(ExcelError::ArchiveFailure(
                "shared string lookup against a null store".to_string(),
            ));
        };

        index_file.seek(SeekFrom::Start(i as u64 * INDEX_RECORD_LEN))?;
        let mut record = [0u8; INDEX_RECORD_LEN as usize];
        if !read_as_much_as_possible(index_file, &mut record)? {
            log::warn!("shared string index {i} is out of range (table has {} entries), treating as empty", self.len);
            return Ok(String::new());
        }

        let digits = std::str::from_utf8(&record[..20])
            .map_err(|e| ExcelError::EncodingFailure(format!("corrupt index record: {e}")))?;
        let offset: u64 = digits
            .parse()
            .map_err(|e| ExcelError::EncodingFailure(format!("corrupt index offset: {e}")))?;

        data_file.seek(SeekFrom::Start(offset))?;
        let mut len_buf = [0u8; 4];
        if !read_as_much_as_possible(data_file, &mut len_buf)? {
            log::warn!("shared string index {i} points past the end of the data file, treating as empty");
            return Ok(String::new());
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut bytes = vec![0u8; len];
        if !read_as_much_as_possible(data_file, &mut bytes)? {
            log::warn!("shared string index {i} has a truncated record (expected {len} bytes), treating as empty");
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Reads into `buf` until it is full or the source is exhausted. Returns
/// `true` if `buf` was filled, `false` on a short read (treated as a
/// tolerated gap by callers, never a propagated I/O error).
fn read_as_much_as_possible(file: &mut File, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0;
    while total < buf.len() {
        let n = file.read(&mut buf[total..])?;
        if n == 0 {
            return Ok(false);
        }
        total += n;
    }
    Ok(true)
}

/// Streams `xl/sharedStrings.xml` and writes the on-disk index/data pair
/// described in the data model. If the workbook has no shared-string part,
/// the caller should skip this entirely and use [`SharedStringStore::null`].
pub struct SharedStringStoreBuilder;

impl SharedStringStoreBuilder {
    /// Builds a store from `source`, writing its two backing files under
    /// `temp_dir` via scoped [`TempFileLease`]s.
    pub fn build<R: Read>(source: R, temp_dir: &Path) -> Result<SharedStringStore> {
        let (index_lease, mut index_file) = TempFileLease::create_in(temp_dir, "sst-index")?;
        let (data_lease, mut data_file) = TempFileLease::create_in(temp_dir, "sst-data")?;

        let mut reader = Reader::from_reader(std::io::BufReader::new(source));
        reader.config_mut().trim_text(false);

        let mut buf = Vec::with_capacity(4096);
        let mut data_offset: u64 = 0;
        let mut count: usize = 0;

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"si" => {
                    let text = read_si_text(&mut reader)?;
                    write_record(&mut index_file, &mut data_file, &mut data_offset, &text)?;
                    count += 1;
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                    write_record(&mut index_file, &mut data_file, &mut data_offset, "")?;
                    count += 1;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        index_file.flush()?;
        data_file.flush()?;

        Ok(SharedStringStore {
            index_file: Some(index_file),
            data_file: Some(data_file),
            len: count,
            _index_lease: Some(index_lease),
            _data_lease: Some(data_lease),
        })
    }
}

/// Reads the body of an `<si>` element, concatenating the text content of
/// every descendant `<t>` node (this subsumes rich-text `<r><t>…</t></r>`
/// runs) until the matching `</si>`.
fn read_si_text<R: BufRead>(reader: &mut Reader<R>) -> Result<String> {
    let mut text = String::new();
    let mut in_t = false;
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"t" => {
                in_t = true;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"t" => {
                // self-closing <t/> contributes no text
            }
            Event::End(ref e) if e.local_name().as_ref() == b"t" => {
                in_t = false;
            }
            Event::Text(ref e) if in_t => {
                text.push_str(&e.unescape()?);
            }
            Event::End(ref e) if e.local_name().as_ref() == b"si" => break,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn write_record(
    index_file: &mut File,
    data_file: &mut File,
    data_offset: &mut u64,
    text: &str,
) -> Result<()> {
    let mut record = [b'0'; INDEX_RECORD_LEN as usize];
    let digits = format!("{:020}", data_offset);
    record[..20].copy_from_slice(digits.as_bytes());
    record[20] = b'\n';
    index_file.write_all(&record)?;

    let bytes = text.as_bytes();
    data_file.write_all(&(bytes.len() as u32).to_be_bytes())?;
    data_file.write_all(bytes)?;

    *data_offset += 4 + bytes.len() as u64;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(xml: &str) -> SharedStringStore {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStringStoreBuilder::build(xml.as_bytes(), dir.path()).unwrap();
        // keep dir alive for the duration of the caller's use of `store`
        std::mem::forget(dir);
        store
    }

    #[test]
    fn builds_and_looks_up_simple_strings() {
        let xml = r#"<sst><si><t>foo</t></si><si><t>bar</t></si><si><t>baz</t></si></sst>"#;
        let mut store = build(xml);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(0).unwrap(), "foo");
        assert_eq!(store.get(1).unwrap(), "bar");
        assert_eq!(store.get(2).unwrap(), "baz");
    }

    #[test]
    fn concatenates_rich_text_runs() {
        let xml = r#"<sst><si><r><t>Hello, </t></r><r><t>world</t></r></si></sst>"#;
        let mut store = build(xml);
        assert_eq!(store.get(0).unwrap(), "Hello, world");
    }

    #[test]
    fn out_of_range_index_is_tolerant_empty() {
        let xml = r#"<sst><si><t>only</t></si></sst>"#;
        let mut store = build(xml);
        assert_eq!(store.get(99).unwrap(), "");
    }

    #[test]
    fn null_store_lookup_is_a_hard_failure() {
        let mut store = SharedStringStore::null();
        assert!(store.get(0).is_err());
    }

    #[test]
    fn index_offsets_are_monotonically_nondecreasing() {
        let xml = r#"<sst><si><t>a</t></si><si><t>bb</t></si><si><t>ccc</t></si></sst>"#;
        let dir = tempfile::tempdir().unwrap();
        let mut store = SharedStringStoreBuilder::build(xml.as_bytes(), dir.path()).unwrap();
        assert_eq!(store.get(0).unwrap(), "a");
        assert_eq!(store.get(1).unwrap(), "bb");
        assert_eq!(store.get(2).unwrap(), "ccc");
    }
}
