//! Central-directory-driven streaming ZIP reader.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::DeflateDecoder;

use crate::error::{ExcelError, Result};

const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// One entry in the archive's central directory.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub compressed_size: u64,
    pub compression_method: u16,
    pub offset: u64,
}

/// Opens a ZIP archive and allows streaming individual entries by name
/// without decompressing the whole archive up front.
pub struct ArchiveReader {
    file: BufReader<File>,
    entries: Vec<ZipEntry>,
}

impl ArchiveReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let entries = read_central_directory(&mut file)?;
        Ok(Self { file, entries })
    }

    /// All entry names present in the archive, in central-directory order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn find_entry(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Reads an entry fully into memory. Used only for the small, fixed
    /// parts (`xl/workbook.xml`, its rels) that are read as whole strings by
    /// design — never for worksheet or shared-string bodies.
    pub fn read_entry_to_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_entry_to_vec(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn read_entry_to_vec(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut reader = self.open_entry_stream(name)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Returns a streaming, on-the-fly-decompressing reader positioned at
    /// the start of `name`'s content. This is the entry point the row
    /// streamer and shared-string builder use so a multi-gigabyte worksheet
    /// is never materialized in memory.
    pub fn open_entry_stream(&mut self, name: &str) -> Result<Box<dyn Read + '_>> {
        let entry = self
            .find_entry(name)
            .ok_or_else(|| ExcelError::ArchiveFailure(format!("entry not found: {name}")))?
            .clone();
        self.open_entry_stream_at(&entry)
    }

    fn open_entry_stream_at(&mut self, entry: &ZipEntry) -> Result<Box<dyn Read + '_>> {
        self.file.seek(SeekFrom::Start(entry.offset))?;

        let signature = read_u32_le(&mut self.file)?;
        if signature != LOCAL_FILE_HEADER_SIGNATURE {
            return Err(ExcelError::ArchiveFailure(
                "invalid local file header signature".to_string(),
            ));
        }

        self.file.seek(SeekFrom::Current(6))?; // version, flags, compression method
        self.file.seek(SeekFrom::Current(8))?; // mtime/mdate, crc32
        self.file.seek(SeekFrom::Current(8))?; // compressed/uncompressed sizes

        let filename_len = read_u16_le(&mut self.file)? as i64;
        let extra_len = read_u16_le(&mut self.file)? as i64;
        self.file.seek(SeekFrom::Current(filename_len + extra_len))?;

        let limited = (&mut self.file).take(entry.compressed_size);
        match entry.compression_method {
            8 => Ok(Box::new(DeflateDecoder::new(limited))),
            0 => Ok(Box::new(limited)),
            other => Err(ExcelError::ArchiveFailure(format!(
                "unsupported compression method: {other}"
            ))),
        }
    }
}

fn read_central_directory(file: &mut BufReader<File>) -> Result<Vec<ZipEntry>> {
    let eocd_offset = find_eocd(file)?;
    file.seek(SeekFrom::Start(eocd_offset))?;

    let signature = read_u32_le(file)?;
    if signature != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
        return Err(ExcelError::ArchiveFailure(format!(
            "invalid end-of-central-directory signature: 0x{signature:08x}"
        )));
    }

    file.seek(SeekFrom::Current(4))?; // disk number fields
    let _entries_on_disk = read_u16_le(file)?;
    let total_entries = read_u16_le(file)? as usize;
    let _cd_size = read_u32_le(file)?;
    let cd_offset = read_u32_le(file)? as u64;

    file.seek(SeekFrom::Start(cd_offset))?;

    let mut entries = Vec::with_capacity(total_entries);
    for _ in 0..total_entries {
        let signature = read_u32_le(file)?;
        if signature != CENTRAL_DIRECTORY_SIGNATURE {
            break;
        }

        file.seek(SeekFrom::Current(6))?; // version made by/needed, flags
        let compression_method = read_u16_le(file)?;
        file.seek(SeekFrom::Current(8))?; // mtime/mdate, crc32
        let compressed_size = read_u32_le(file)? as u64;
        let _uncompressed_size = read_u32_le(file)? as u64;
        let filename_len = read_u16_le(file)? as usize;
        let extra_len = read_u16_le(file)? as usize;
        let comment_len = read_u16_le(file)? as usize;
        file.seek(SeekFrom::Current(8))?; // disk number, internal/external attrs
        let offset = read_u32_le(file)? as u64;

        let mut filename_buf = vec![0u8; filename_len];
        file.read_exact(&mut filename_buf)?;
        let name = String::from_utf8_lossy(&filename_buf).to_string();

        file.seek(SeekFrom::Current((extra_len + comment_len) as i64))?;

        entries.push(ZipEntry {
            name,
            compressed_size,
            compression_method,
            offset,
        });
    }

    Ok(entries)
}

fn find_eocd(file: &mut BufReader<File>) -> Result<u64> {
    let file_size = file.seek(SeekFrom::End(0))?;
    let search_start = file_size.saturating_sub(65557);
    file.seek(SeekFrom::Start(search_start))?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    for i in (0..buffer.len().saturating_sub(3)).rev() {
        if buffer[i] == 0x50 && buffer[i + 1] == 0x4b && buffer[i + 2] == 0x05 && buffer[i + 3] == 0x06 {
            return Ok(search_start + i as u64);
        }
    }

    Err(ExcelError::ArchiveFailure(
        "end of central directory not found".to_string(),
    ))
}

fn read_u16_le(file: &mut BufReader<File>) -> Result<u16> {
    let mut buf = [0u8; 2];
    file.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_le(file: &mut BufReader<File>) -> Result<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;

    #[test]
    fn round_trips_a_stored_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.zip");

        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.start_entry("hello.txt").unwrap();
        writer.write_data(b"hello, world!").unwrap();
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert_eq!(reader.names().collect::<Vec<_>>(), vec!["hello.txt"]);
        let content = reader.read_entry_to_string("hello.txt").unwrap();
        assert_eq!(content, "hello, world!");
    }

    #[test]
    fn streams_an_entry_without_full_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.zip");

        let mut writer = ArchiveWriter::create(&path).unwrap();
        writer.start_entry("big.txt").unwrap();
        let chunk = vec![b'x'; 4096];
        for _ in 0..16 {
            writer.write_data(&chunk).unwrap();
        }
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        let mut stream = reader.open_entry_stream("big.txt").unwrap();
        let mut total = 0usize;
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, 4096 * 16);
    }

    #[test]
    fn missing_entry_is_an_archive_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        let writer = ArchiveWriter::create(&path).unwrap();
        writer.finish().unwrap();

        let mut reader = ArchiveReader::open(&path).unwrap();
        assert!(reader.open_entry_stream("nope.txt").is_err());
    }
}
