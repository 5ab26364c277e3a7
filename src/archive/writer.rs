//! Streaming ZIP writer: DEFLATE-compresses each entry on the fly and
//! defers CRC/size bookkeeping to a trailing data descriptor.

use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher as Crc32;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{ExcelError, Result};

struct RecordedEntry {
    name: String,
    local_header_offset: u64,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
}

struct CrcCountingWriter {
    output: File,
    crc: Crc32,
    uncompressed_count: u64,
    compressed_count: u64,
}

impl CrcCountingWriter {
    fn new(output: File) -> Self {
        Self {
            output,
            crc: Crc32::new(),
            uncompressed_count: 0,
            compressed_count: 0,
        }
    }
}

impl Write for CrcCountingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.output.write(buf)?;
        self.compressed_count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.output.flush()
    }
}

struct CurrentEntry {
    name: String,
    local_header_offset: u64,
    encoder: DeflateEncoder<CrcCountingWriter>,
}

/// Streaming ZIP writer used by [`crate::package_assembler::PackageAssembler`].
///
/// Every add failure is meant to discard the whole archive: callers should
/// drop the writer (without calling [`ArchiveWriter::finish`]) and delete
/// the partial output file via an [`crate::temp_lease::OutputGuard`] rather
/// than trying to repair a half-written entry.
pub struct ArchiveWriter {
    output_path: PathBuf,
    output: File,
    entries: Vec<RecordedEntry>,
    current_entry: Option<CurrentEntry>,
    compression_level: u32,
}

impl ArchiveWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let output_path = path.as_ref().to_path_buf();
        let output = File::create(&output_path)?;
        Ok(Self {
            output_path,
            output,
            entries: Vec::new(),
            current_entry: None,
            compression_level: 6,
        })
    }

    /// Starts a new entry named `name`, finishing whatever entry was
    /// previously open.
    pub fn start_entry(&mut self, name: &str) -> Result<()> {
        self.finish_current_entry()?;

        let local_header_offset = self.output.stream_position()?;

        self.output.write_all(&[0x50, 0x4b, 0x03, 0x04])?; // local file header signature
        self.output.write_all(&[20, 0])?; // version needed
        self.output.write_all(&[8, 0])?; // general-purpose flag: bit 3 (data descriptor follows)
        self.output.write_all(&[8, 0])?; // compression method: deflate
        self.output.write_all(&[0, 0, 0, 0])?; // mod time/date
        self.output.write_all(&0u32.to_le_bytes())?; // crc32 placeholder
        self.output.write_all(&0u32.to_le_bytes())?; // compressed size placeholder
        self.output.write_all(&0u32.to_le_bytes())?; // uncompressed size placeholder
        self.output.write_all(&(name.len() as u16).to_le_bytes())?;
        self.output.write_all(&0u16.to_le_bytes())?; // extra field length
        self.output.write_all(name.as_bytes())?;

        let counting_writer = CrcCountingWriter::new(self.output.try_clone()?);
        let encoder = DeflateEncoder::new(counting_writer, Compression::new(self.compression_level));

        self.current_entry = Some(CurrentEntry {
            name: name.to_string(),
            local_header_offset,
            encoder,
        });

        Ok(())
    }

    /// Writes (uncompressed) bytes into the currently open entry.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let entry = self
            .current_entry
            .as_mut()
            .ok_or_else(|| ExcelError::ArchiveFailure("no entry started".to_string()))?;

        entry.encoder.get_mut().crc.update(data);
        entry.encoder.get_mut().uncompressed_count += data.len() as u64;
        entry.encoder.write_all(data)?;
        Ok(())
    }

    /// Streams the full contents of `path` into the current entry in fixed
    /// chunks, so a multi-gigabyte worksheet temp file is never slurped
    /// into memory before being added to the archive.
    pub fn write_data_from_file(&mut self, path: &Path) -> Result<()> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.write_data(&buf[..n])?;
        }
        Ok(())
    }

    fn finish_current_entry(&mut self) -> Result<()> {
        let Some(entry) = self.current_entry.take() else {
            return Ok(());
        };

        let counting_writer = entry.encoder.finish()?;
        let crc = counting_writer.crc.finalize();
        let compressed_size = counting_writer.compressed_count as u32;
        let uncompressed_size = counting_writer.uncompressed_count as u32;

        self.output.write_all(&[0x50, 0x4b, 0x07, 0x08])?; // data descriptor signature
        self.output.write_all(&crc.to_le_bytes())?;
        self.output.write_all(&compressed_size.to_le_bytes())?;
        self.output.write_all(&uncompressed_size.to_le_bytes())?;

        self.entries.push(RecordedEntry {
            name: entry.name,
            local_header_offset: entry.local_header_offset,
            crc32: crc,
            compressed_size,
            uncompressed_size,
        });

        Ok(())
    }

    /// Finishes the archive: writes the central directory and the
    /// end-of-central-directory record.
    pub fn finish(mut self) -> Result<()> {
        self.finish_current_entry()?;

        let central_dir_offset = self.output.stream_position()?;

        for entry in &self.entries {
            self.output.write_all(&[0x50, 0x4b, 0x01, 0x02])?; // central directory signature
            self.output.write_all(&[20, 0])?; // version made by
            self.output.write_all(&[20, 0])?; // version needed
            self.output.write_all(&[8, 0])?; // general-purpose flag
            self.output.write_all(&[8, 0])?; // compression method
            self.output.write_all(&[0, 0, 0, 0])?; // mod time/date
            self.output.write_all(&entry.crc32.to_le_bytes())?;
            self.output.write_all(&entry.compressed_size.to_le_bytes())?;
            self.output.write_all(&entry.uncompressed_size.to_le_bytes())?;
            self.output.write_all(&(entry.name.len() as u16).to_le_bytes())?;
            self.output.write_all(&0u16.to_le_bytes())?; // extra length
            self.output.write_all(&0u16.to_le_bytes())?; // comment length
            self.output.write_all(&0u16.to_le_bytes())?; // disk number start
            self.output.write_all(&0u16.to_le_bytes())?; // internal attrs
            self.output.write_all(&0u32.to_le_bytes())?; // external attrs
            self.output
                .write_all(&(entry.local_header_offset as u32).to_le_bytes())?;
            self.output.write_all(entry.name.as_bytes())?;
        }

        let central_dir_size = self.output.stream_position()? - central_dir_offset;

        self.output.write_all(&[0x50, 0x4b, 0x05, 0x06])?; // end of central directory signature
        self.output.write_all(&0u16.to_le_bytes())?; // disk number
        self.output.write_all(&0u16.to_le_bytes())?; // disk with central directory
        self.output.write_all(&(self.entries.len() as u16).to_le_bytes())?;
        self.output.write_all(&(self.entries.len() as u16).to_le_bytes())?;
        self.output.write_all(&(central_dir_size as u32).to_le_bytes())?;
        self.output.write_all(&(central_dir_offset as u32).to_le_bytes())?;
        self.output.write_all(&0u16.to_le_bytes())?; // comment length

        self.output.flush()?;
        Ok(())
    }

    /// Discards the archive entirely: drops the writer and unlinks whatever
    /// partial bytes were written, so a failed part never leaves a half
    /// written archive behind.
    pub fn discard(self) {
        let path = self.output_path.clone();
        drop(self);
        let _ = std::fs::remove_file(path);
    }
}
