//! Hand-rolled streaming ZIP reading and writing.
//!
//! XLSX packages are ZIP archives. Rather than pull in a general-purpose
//! `zip` crate, the reader and writer here only implement the slice of the
//! format this pipeline actually needs: central-directory-driven random
//! access for reading, and DEFLATE-streamed entries with a trailing data
//! descriptor for writing. Both avoid ever holding a whole entry's bytes in
//! memory when a caller asks for a streaming handle.

mod reader;
mod writer;

pub use reader::{ArchiveReader, ZipEntry};
pub use writer::ArchiveWriter;
