//! Error types for the conversion pipeline.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Error kinds produced anywhere in the conversion pipeline.
///
/// Every fallible internal operation returns `Result<T>` built on this enum.
/// The two public conversion entry points ([`crate::convert_xlsx_to_csv`] and
/// [`crate::convert_csv_to_xlsx`]) catch every variant and collapse it to a
/// plain `bool` — nothing above that boundary needs to match on it.
#[derive(Error, Debug)]
pub enum ExcelError {
    /// A path failed `PathValidator`'s policy checks.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A file or stream operation failed.
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    /// The ZIP container could not be read or written.
    #[error("archive failure: {0}")]
    ArchiveFailure(String),

    /// The XML in a part was not well-formed enough to continue.
    #[error("malformed XML: {0}")]
    XmlMalformed(String),

    /// The requested worksheet could not be located.
    #[error("sheet '{sheet}' not found. Available: {available}")]
    SheetNotFound { sheet: String, available: String },

    /// Writing the output archive or one of its parts failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Text could not be decoded, encoded, or sanitized.
    #[error("encoding failure: {0}")]
    EncodingFailure(String),
}

impl From<quick_xml::Error> for ExcelError {
    fn from(err: quick_xml::Error) -> Self {
        ExcelError::XmlMalformed(err.to_string())
    }
}
