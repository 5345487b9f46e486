//! Archive construction
//!
//! Packs converted outputs into one ZIP. Entries are named by base file name
//! only, so scratch directory paths never leak into the archive.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive construction errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("nothing to archive")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task failed: {0}")]
    Task(String),
}

/// Bundles a set of files into a single archive artifact
#[async_trait]
pub trait ArchiveBuilder: Send + Sync {
    /// Write an archive of `files` to `destination` and return its path
    async fn bundle(&self, files: &[PathBuf], destination: &Path) -> Result<PathBuf, ArchiveError>;
}

/// Unique archive entry names for `files`, in order
///
/// Repeated base names get a numeric suffix before the extension:
/// `report.pdf`, `report (2).pdf`, `report (3).pdf`.
pub fn entry_names(files: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    files
        .iter()
        .map(|path| {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output.pdf".to_string());
            if used.insert(base.clone()) {
                return base;
            }

            let (stem, ext) = match base.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
                _ => (base.clone(), String::new()),
            };
            let mut n = 2;
            loop {
                let candidate = format!("{} ({}){}", stem, n, ext);
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Deflate-compressed ZIP builder
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveBuilder;

impl ZipArchiveBuilder {
    pub fn new() -> Self {
        Self
    }
}

fn write_zip(files: &[PathBuf], destination: &Path) -> Result<(), ArchiveError> {
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(destination)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path, name) in files.iter().zip(entry_names(files)) {
        zip.start_file(name.clone(), options)?;
        let mut input = File::open(path)?;
        std::io::copy(&mut input, &mut zip)?;
        debug!(entry = %name, source = %path.display(), "Added archive entry");
    }

    zip.finish()?;
    Ok(())
}

#[async_trait]
impl ArchiveBuilder for ZipArchiveBuilder {
    async fn bundle(&self, files: &[PathBuf], destination: &Path) -> Result<PathBuf, ArchiveError> {
        if files.is_empty() {
            return Err(ArchiveError::Empty);
        }

        let files = files.to_vec();
        let dest = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let result = write_zip(&files, &dest);
            if result.is_err() {
                // Never hand out a truncated archive
                if let Err(e) = std::fs::remove_file(&dest) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %dest.display(), error = %e, "Failed to remove partial archive");
                    }
                }
            }
            result.map(|()| dest)
        })
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
    }
}
