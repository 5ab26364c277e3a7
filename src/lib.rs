//! # excelstream
//!
//! Streaming, bounded-memory conversion between XLSX (the first worksheet of
//! an Office Open XML workbook) and CSV, in both directions.
//!
//! The crate never holds more than one row, one cell, or one shared string in
//! memory at a time — not the whole workbook, not the whole shared-string
//! table. That bound is what lets it handle inputs from a few kilobytes up to
//! multiple gigabytes with the same footprint.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use excelstream::config::StreamingConfig;
//! use excelstream::path_validator::DefaultPathValidator;
//! use excelstream::{convert_csv_to_xlsx, convert_xlsx_to_csv};
//!
//! let validator = DefaultPathValidator::new(std::env::current_dir().unwrap());
//! let config = StreamingConfig::from_env();
//!
//! convert_csv_to_xlsx("data.csv", "data.xlsx", &validator, &config);
//! convert_xlsx_to_csv("data.xlsx", "roundtrip.csv", &validator, &config);
//! ```
//!
//! See the module docs for each collaborator named in the pipeline:
//! [`archive`], [`workbook_locator`], [`shared_strings`], [`row_streamer`],
//! [`worksheet_writer`], [`package_assembler`], [`csv`], [`column`],
//! [`xml_sanitize`], [`path_validator`], [`temp_lease`], [`config`].

pub mod archive;
pub mod column;
pub mod config;
mod convert;
pub mod csv;
pub mod error;
pub mod package_assembler;
pub mod path_validator;
pub mod row_streamer;
pub mod shared_strings;
pub mod temp_lease;
pub mod workbook_locator;
pub mod worksheet_writer;
pub mod xml_sanitize;

pub use convert::{convert_csv_to_xlsx, convert_xlsx_to_csv};
pub use error::{ExcelError, Result};
