//! Pluggable path validation policy.
//!
//! The project-root-versus-temp sandboxing decision is explicitly a
//! collaborator, not a hardcoded rule: callers supply a [`PathValidator`]
//! implementation (the [`DefaultPathValidator`] below is the one the CLI
//! wires up), constructed with its project root passed in at construction
//! time rather than discovered from an ambient global.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ExcelError, Result};

/// The five-state lifecycle a conversion moves through. Any failure while in
/// `Validate`, `Open`, `Stream`, or `Finalize` transitions straight to
/// `Cleanup` with `success = false`; `Cleanup` itself never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Validate,
    Open,
    Stream,
    Finalize,
    Cleanup,
}

/// Validates input and output paths before any I/O against them is
/// attempted.
pub trait PathValidator {
    /// Validates `path` as a conversion input: must canonicalize to an
    /// existing, readable regular file under an allowed root.
    fn validate_input(&self, path: &str) -> Result<PathBuf>;

    /// Validates `path` as a conversion output: its parent must exist, be a
    /// directory, and be writable, and the path itself must sit under an
    /// allowed root. Returns the canonical parent joined with the file name
    /// — the output file itself need not exist yet.
    fn validate_output(&self, path: &str) -> Result<PathBuf>;
}

/// The default policy described in the design: reject URL-scheme wrappers,
/// NUL bytes, empty paths, and `..` components; after canonicalization,
/// require the result to live under either the configured project root or
/// the system temp directory.
pub struct DefaultPathValidator {
    project_root: PathBuf,
}

impl DefaultPathValidator {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    fn reject_syntactically_unsafe(path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(ExcelError::InvalidPath("empty path".to_string()));
        }
        if path.contains('\0') {
            return Err(ExcelError::InvalidPath("path contains NUL byte".to_string()));
        }
        if has_url_scheme(path) {
            return Err(ExcelError::InvalidPath(format!(
                "path looks like a URL: {path}"
            )));
        }
        if path.split('/').any(|component| component == "..") {
            return Err(ExcelError::InvalidPath(format!(
                "path contains a '..' component: {path}"
            )));
        }
        Ok(())
    }

    fn under_allowed_root(&self, canonical: &Path) -> bool {
        let temp_dir = std::env::temp_dir();
        let under_temp = fs::canonicalize(&temp_dir)
            .map(|t| canonical.starts_with(&t))
            .unwrap_or_else(|_| canonical.starts_with(&temp_dir));
        let under_project = fs::canonicalize(&self.project_root)
            .map(|r| canonical.starts_with(&r))
            .unwrap_or_else(|_| canonical.starts_with(&self.project_root));
        under_temp || under_project
    }
}

impl PathValidator for DefaultPathValidator {
    fn validate_input(&self, path: &str) -> Result<PathBuf> {
        Self::reject_syntactically_unsafe(path)?;

        let canonical = fs::canonicalize(path)
            .map_err(|e| ExcelError::InvalidPath(format!("cannot resolve '{path}': {e}")))?;

        if !self.under_allowed_root(&canonical) {
            return Err(ExcelError::InvalidPath(format!(
                "'{path}' is outside the allowed project root or temp directory"
            )));
        }

        let metadata = fs::metadata(&canonical)
            .map_err(|e| ExcelError::InvalidPath(format!("cannot stat '{path}': {e}")))?;
        if !metadata.is_file() {
            return Err(ExcelError::InvalidPath(format!(
                "'{path}' is not a regular file"
            )));
        }
        fs::File::open(&canonical)
            .map_err(|e| ExcelError::InvalidPath(format!("cannot read '{path}': {e}")))?;

        Ok(canonical)
    }

    fn validate_output(&self, path: &str) -> Result<PathBuf> {
        Self::reject_syntactically_unsafe(path)?;

        let raw = Path::new(path);
        let file_name = raw
            .file_name()
            .ok_or_else(|| ExcelError::InvalidPath(format!("'{path}' has no file name")))?;
        let parent = raw.parent().filter(|p| !p.as_os_str().is_empty());
        let parent = parent.unwrap_or_else(|| Path::new("."));

        let canonical_parent = fs::canonicalize(parent)
            .map_err(|e| ExcelError::InvalidPath(format!("cannot resolve parent of '{path}': {e}")))?;

        let metadata = fs::metadata(&canonical_parent)
            .map_err(|e| ExcelError::InvalidPath(format!("cannot stat parent of '{path}': {e}")))?;
        if !metadata.is_dir() {
            return Err(ExcelError::InvalidPath(format!(
                "parent of '{path}' is not a directory"
            )));
        }
        if metadata.permissions().readonly() {
            return Err(ExcelError::InvalidPath(format!(
                "parent of '{path}' is not writable"
            )));
        }

        let candidate = canonical_parent.join(file_name);
        if !self.under_allowed_root(&canonical_parent) {
            return Err(ExcelError::InvalidPath(format!(
                "'{path}' is outside the allowed project root or temp directory"
            )));
        }

        Ok(candidate)
    }
}

fn has_url_scheme(path: &str) -> bool {
    let Some(colon) = path.find("://") else {
        return false;
    };
    let scheme = &path[..colon];
    if scheme.is_empty() {
        return false;
    }
    let mut chars = scheme.chars();
    let first_ok = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false);
    first_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '.' || c == '-')
}
