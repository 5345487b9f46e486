//! User-facing reply texts

use crate::error::RelayError;
use dcr_common::human_size::format_megabytes;

/// Reply to an empty `/done`
pub const NO_FILES: &str = "No files to convert.";

/// Reply to `/start`
pub fn usage(max_file_size_bytes: u64) -> String {
    format!(
        "Send me DOC/DOCX files. You can send multiple messages. \
         When done, send /done to get a single ZIP with all PDFs! \
         Files larger than {} will be skipped.",
        format_megabytes(max_file_size_bytes)
    )
}

/// Placeholder shown while a file is fetched and converted
pub fn converting(file_name: &str) -> String {
    format!("Converting {}...", file_name)
}

pub fn converted(file_name: &str, batch_len: usize) -> String {
    format!(
        "{} converted successfully! Total files in batch: {}",
        file_name, batch_len
    )
}

/// Size rejection; `size` is `None` when only the download revealed it
pub fn too_large(file_name: &str, size: Option<u64>, limit: u64) -> String {
    match size {
        Some(size) => format!(
            "File {} is too large ({}) and was skipped.",
            file_name,
            format_megabytes(size)
        ),
        None => format!(
            "File {} is too large (over {}) and was skipped.",
            file_name,
            format_megabytes(limit)
        ),
    }
}

/// Reply for a failed intake
pub fn intake_failed(file_name: &str, err: &RelayError) -> String {
    match err {
        RelayError::FileTooLarge { size, limit } => too_large(file_name, *size, *limit),
        other => format!("Error converting {}: {}", file_name, other),
    }
}

/// Reply for a failed finalize
pub fn finalize_failed(err: &RelayError) -> String {
    format!("Failed to deliver the archive: {}", err)
}
