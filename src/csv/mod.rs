//! RFC 4180-style CSV encoding/decoding, delimiter inference, and the
//! forward-only row reader used on the CSV → XLSX path.

mod dialect;
mod reader;
mod writer;

pub use dialect::{encode_row, CANDIDATE_DELIMITERS};
pub use reader::{detect_delimiter, CsvRowStreamer};
pub use writer::CsvWriter;
