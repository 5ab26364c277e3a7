//! The two public conversion entry points, orchestrating every collaborator
//! through the `Validate -> Open -> Stream -> Finalize -> Cleanup` lifecycle.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use crate::archive::ArchiveReader;
use crate::config::StreamingConfig;
use crate::csv::{detect_delimiter, CsvRowStreamer, CsvWriter};
use crate::error::Result;
use crate::path_validator::{ConversionState, PathValidator};
use crate::package_assembler::PackageAssembler;
use crate::row_streamer::RowStreamer;
use crate::shared_strings::{SharedStringStore, SharedStringStoreBuilder};
use crate::temp_lease::OutputGuard;
use crate::workbook_locator::WorkbookLocator;
use crate::worksheet_writer::WorksheetXmlWriter;

const SHARED_STRINGS_ENTRY: &str = "xl/sharedStrings.xml";

/// Converts an XLSX workbook's first worksheet to CSV.
///
/// Collapses every internal error to `false`: on any failure the output
/// file is guaranteed not to exist on return, never a partial one.
pub fn convert_xlsx_to_csv(
    input: &str,
    output: &str,
    validator: &dyn PathValidator,
    config: &StreamingConfig,
) -> bool {
    match run_xlsx_to_csv(input, output, validator, config) {
        Ok(()) => {
            log::info!("xlsx_to_csv: '{input}' -> '{output}' succeeded");
            true
        }
        Err(err) => {
            log::error!("xlsx_to_csv: '{input}' -> '{output}' failed: {err}");
            false
        }
    }
}

/// Converts a CSV file to a minimal single-sheet XLSX workbook.
///
/// Same all-or-nothing guarantee as [`convert_xlsx_to_csv`]: any failure
/// unlinks whatever partial output existed and returns `false`.
pub fn convert_csv_to_xlsx(
    input: &str,
    output: &str,
    validator: &dyn PathValidator,
    config: &StreamingConfig,
) -> bool {
    match run_csv_to_xlsx(input, output, validator, config) {
        Ok(()) => {
            log::info!("csv_to_xlsx: '{input}' -> '{output}' succeeded");
            true
        }
        Err(err) => {
            log::error!("csv_to_xlsx: '{input}' -> '{output}' failed: {err}");
            false
        }
    }
}

fn run_xlsx_to_csv(
    input: &str,
    output: &str,
    validator: &dyn PathValidator,
    config: &StreamingConfig,
) -> Result<()> {
    let mut state = ConversionState::Validate;
    log::debug!("xlsx_to_csv: {state:?}");
    let input_path = validator.validate_input(input)?;
    let output_path = validator.validate_output(output)?;

    state = ConversionState::Open;
    log::debug!("xlsx_to_csv: {state:?}");
    let mut archive = ArchiveReader::open(&input_path)?;
    let worksheet_entry = WorkbookLocator::locate(&mut archive)?;

    let mut sst = build_shared_string_store(&mut archive, config)?;

    state = ConversionState::Stream;
    log::debug!("xlsx_to_csv: {state:?}");
    let output_guard = OutputGuard::new(output_path.clone());
    let out_file = File::create(&output_path)?;
    let mut csv_writer = CsvWriter::new(BufWriter::new(out_file));
    {
        let sheet_stream = archive.open_entry_stream(&worksheet_entry)?;
        let streamer = RowStreamer::new(BufReader::new(sheet_stream));
        streamer.stream_to_csv(&mut sst, &mut csv_writer)?;
    }
    csv_writer.flush()?;

    state = ConversionState::Finalize;
    log::debug!("xlsx_to_csv: {state:?}");
    output_guard.commit();

    state = ConversionState::Cleanup;
    log::debug!("xlsx_to_csv: {state:?}");
    Ok(())
}

fn build_shared_string_store(
    archive: &mut ArchiveReader,
    config: &StreamingConfig,
) -> Result<SharedStringStore> {
    if archive.find_entry(SHARED_STRINGS_ENTRY).is_none() {
        return Ok(SharedStringStore::null());
    }
    let stream = archive.open_entry_stream(SHARED_STRINGS_ENTRY)?;
    SharedStringStoreBuilder::build(stream, &config.temp_dir)
}

fn run_csv_to_xlsx(
    input: &str,
    output: &str,
    validator: &dyn PathValidator,
    config: &StreamingConfig,
) -> Result<()> {
    let mut state = ConversionState::Validate;
    log::debug!("csv_to_xlsx: {state:?}");
    let input_path = validator.validate_input(input)?;
    let output_path = validator.validate_output(output)?;

    state = ConversionState::Open;
    log::debug!("csv_to_xlsx: {state:?}");
    let mut input_file = File::open(&input_path)?;
    let delimiter = detect_delimiter(&mut input_file)?;

    state = ConversionState::Stream;
    log::debug!("csv_to_xlsx: {state:?}");
    let output_guard = OutputGuard::new(output_path.clone());
    let mut worksheet = WorksheetXmlWriter::create(&config.temp_dir)?;
    {
        let mut rows = CsvRowStreamer::new(BufReader::new(&input_file), delimiter);
        while let Some(row) = rows.next_row()? {
            worksheet.write_row(&row)?;
        }
    }
    let (_worksheet_lease, worksheet_path) = worksheet.finish()?;

    state = ConversionState::Finalize;
    log::debug!("csv_to_xlsx: {state:?}");
    PackageAssembler::assemble(&output_path, &worksheet_path)?;
    output_guard.commit();

    state = ConversionState::Cleanup;
    log::debug!("csv_to_xlsx: {state:?}");
    Ok(())
    // `_worksheet_lease` drops here, unlinking the worksheet temp file on
    // every exit path, success included.
}
