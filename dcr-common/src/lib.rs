//! # DCR Common Library
//!
//! Shared code for the document conversion relay:
//! - Error and result types
//! - TOML bootstrap configuration loading
//! - Tracing subscriber initialisation
//! - Human-readable byte sizes

pub mod config;
pub mod error;
pub mod human_size;
pub mod logging;

pub use error::{Error, Result};
