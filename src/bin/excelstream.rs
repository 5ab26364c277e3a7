//! Command-line harness: `excelstream <input> <output> <mode>`.
//!
//! Thin by design — argument parsing and the timing/memory report live here;
//! every bit of conversion logic lives in the library. `RUST_LOG` controls
//! diagnostic verbosity (`env_logger` is the only place this crate chooses a
//! concrete logging backend).

use std::env;
use std::time::Instant;

use excelstream::config::StreamingConfig;
use excelstream::path_validator::DefaultPathValidator;
use excelstream::{convert_csv_to_xlsx, convert_xlsx_to_csv};

const DEFAULT_INPUT: &str = "./test.csv";
const DEFAULT_OUTPUT: &str = "./output.xlsx";
const DEFAULT_MODE: &str = "csv_to_xlsx";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = args.get(1).map(String::as_str).unwrap_or(DEFAULT_INPUT);
    let output = args.get(2).map(String::as_str).unwrap_or(DEFAULT_OUTPUT);
    let mode = args.get(3).map(String::as_str).unwrap_or(DEFAULT_MODE);

    if mode != "csv_to_xlsx" && mode != "xlsx_to_csv" {
        eprintln!("invalid mode '{mode}': expected 'csv_to_xlsx' or 'xlsx_to_csv'");
        std::process::exit(1);
    }
    if !std::path::Path::new(input).exists() {
        eprintln!("input file not found: {input}");
        std::process::exit(1);
    }

    log::info!("excelstream: mode={mode} input={input} output={output}");

    let project_root = env::current_dir().unwrap_or_else(|_| ".".into());
    let validator = DefaultPathValidator::new(project_root);
    let config = StreamingConfig::from_env();

    let started = Instant::now();
    let ok = match mode {
        "csv_to_xlsx" => convert_csv_to_xlsx(input, output, &validator, &config),
        _ => convert_xlsx_to_csv(input, output, &validator, &config),
    };
    let elapsed = started.elapsed();

    println!("{}", if ok { "SUCCESS" } else { "FAILED" });
    println!("elapsed: {:.3}s", elapsed.as_secs_f64());
    if let Some(peak_rss_kb) = peak_rss_kb() {
        println!("peak RSS: {peak_rss_kb} KB");
    }

    std::process::exit(0);
}

/// Best-effort peak resident set size, read from `/proc/self/status` on
/// Linux. Returns `None` anywhere that file doesn't exist (e.g. macOS,
/// Windows) — the report block simply omits the line in that case.
fn peak_rss_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            return rest.trim().trim_end_matches(" kB").trim().parse().ok();
        }
    }
    None
}
