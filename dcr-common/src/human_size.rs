//! Human-readable byte sizes
//!
//! Sizes shown to chat users are whole mebibytes, rounded down, labelled "MB".

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Whole mebibytes in `bytes`, rounded down
pub fn megabytes(bytes: u64) -> u64 {
    bytes / BYTES_PER_MEGABYTE
}

/// Format a byte count as whole mebibytes
///
/// # Examples
///
/// ```
/// use dcr_common::human_size::format_megabytes;
///
/// assert_eq!(format_megabytes(50 * 1024 * 1024), "50 MB");
/// assert_eq!(format_megabytes(80 * 1024 * 1024 + 17), "80 MB");
/// assert_eq!(format_megabytes(1000), "0 MB");
/// ```
pub fn format_megabytes(bytes: u64) -> String {
    format!("{} MB", megabytes(bytes))
}
