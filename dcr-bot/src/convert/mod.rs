//! Document conversion
//!
//! The relay treats the conversion engine as a black box behind
//! [`DocumentConverter`]: one source file in, one PDF next to it out.

pub mod soffice;

pub use soffice::SofficeConverter;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source extensions the relay accepts (compared case-insensitively)
pub const SOURCE_EXTENSIONS: &[&str] = &["doc", "docx"];

/// Extension of every converted output
pub const TARGET_EXTENSION: &str = "pdf";

/// Conversion failures, reported to the user verbatim
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("unsupported file type '{0}', only DOC and DOCX are accepted")]
    UnsupportedFormat(String),

    #[error("could not start converter: {0}")]
    Spawn(String),

    #[error("converter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("converter produced no output at {0}")]
    MissingOutput(String),
}

/// Converts one document into a PDF
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Converter name for logging
    fn name(&self) -> &'static str;

    /// Convert `source`, returning the path of the produced PDF
    ///
    /// The output is written to [`output_path_for`]`(source)`.
    async fn convert(&self, source: &Path) -> Result<PathBuf, ConversionError>;
}

/// Lower-cased extension of `path`, if any
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Whether the file name carries a recognised source extension
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Output path for `source`: same directory and stem, `.pdf` extension
///
/// ```
/// use dcr_bot::convert::output_path_for;
/// use std::path::Path;
///
/// let out = output_path_for(Path::new("/w/1/report.docx")).unwrap();
/// assert_eq!(out, Path::new("/w/1/report.pdf"));
/// ```
pub fn output_path_for(source: &Path) -> Result<PathBuf, ConversionError> {
    if !is_supported(source) {
        let ext = extension_of(source).unwrap_or_else(|| "(none)".to_string());
        return Err(ConversionError::UnsupportedFormat(ext));
    }
    Ok(source.with_extension(TARGET_EXTENSION))
}
