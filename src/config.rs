//! Environment-driven configuration for the conversion pipeline.
//!
//! The project-root-versus-temp sandboxing decision is explicit
//! configuration set at construction time (see the design notes on
//! "process-wide state"), not an ambient global — this module is where a
//! caller assembles that configuration, defaulting pieces of it from the
//! environment the way the original crate's memory profiles did.

use std::path::PathBuf;

/// I/O buffer sizing tiers, picked by input size class. Mirrors the spirit
/// of tuning flush cadence to available memory: smaller tiers trade
/// throughput for a smaller working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferProfile {
    /// Constrained environments (< 512MB budget): 64KB I/O chunks.
    Low,
    /// Default: 256KB I/O chunks.
    Medium,
    /// Generous budget (> 1GB): 1MB I/O chunks.
    High,
}

impl BufferProfile {
    pub fn from_memory_mb(memory_mb: usize) -> Self {
        if memory_mb < 512 {
            BufferProfile::Low
        } else if memory_mb < 1024 {
            BufferProfile::Medium
        } else {
            BufferProfile::High
        }
    }

    /// Detects from the `EXCELSTREAM_MEMORY_LIMIT_MB` environment variable,
    /// defaulting to `Medium` when unset or unparseable.
    pub fn from_env() -> Self {
        std::env::var("EXCELSTREAM_MEMORY_LIMIT_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .map(Self::from_memory_mb)
            .unwrap_or(BufferProfile::Medium)
    }

    pub fn chunk_size(&self) -> usize {
        match self {
            BufferProfile::Low => 64 * 1024,
            BufferProfile::Medium => 256 * 1024,
            BufferProfile::High => 1024 * 1024,
        }
    }
}

/// Configuration a caller assembles once and passes into a conversion.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Directory scoped temp files (shared-string index/data, worksheet
    /// body) are created under. Defaults to `std::env::temp_dir()`.
    pub temp_dir: PathBuf,
    /// Root a [`crate::path_validator::DefaultPathValidator`] treats as an
    /// additional allowed root alongside the system temp directory.
    pub project_root: PathBuf,
    /// I/O chunk size used when streaming a worksheet temp file into the
    /// output archive.
    pub buffer_profile: BufferProfile,
}

impl StreamingConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            project_root: project_root.into(),
            buffer_profile: BufferProfile::Medium,
        }
    }

    /// Builds configuration from the environment:
    /// - `EXCELSTREAM_TEMP_DIR` overrides the temp directory.
    /// - `EXCELSTREAM_PROJECT_ROOT` overrides the project root (defaults to
    ///   the process's current directory).
    /// - `EXCELSTREAM_MEMORY_LIMIT_MB` selects the [`BufferProfile`].
    pub fn from_env() -> Self {
        let temp_dir = std::env::var("EXCELSTREAM_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());
        let project_root = std::env::var("EXCELSTREAM_PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        Self {
            temp_dir,
            project_root,
            buffer_profile: BufferProfile::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_profile_tiers_by_memory() {
        assert_eq!(BufferProfile::from_memory_mb(256), BufferProfile::Low);
        assert_eq!(BufferProfile::from_memory_mb(768), BufferProfile::Medium);
        assert_eq!(BufferProfile::from_memory_mb(2048), BufferProfile::High);
    }

    #[test]
    fn chunk_sizes_increase_with_tier() {
        assert!(BufferProfile::Low.chunk_size() < BufferProfile::Medium.chunk_size());
        assert!(BufferProfile::Medium.chunk_size() < BufferProfile::High.chunk_size());
    }

    #[test]
    fn new_defaults_to_system_temp_dir() {
        let config = StreamingConfig::new("/tmp/project");
        assert_eq!(config.temp_dir, std::env::temp_dir());
        assert_eq!(config.buffer_profile, BufferProfile::Medium);
    }
}
