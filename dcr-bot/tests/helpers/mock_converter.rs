//! Scripted converter
//!
//! Behaviour is keyed off the source file name:
//! - names containing `bad` fail like a corrupt document
//! - names containing `slow` never finish (exercises the timeout)
//! - everything else is "converted" by prefixing the source bytes
//!
//! An optional gate holds every conversion until the test releases it.

use async_trait::async_trait;
use dcr_bot::convert::{output_path_for, ConversionError, DocumentConverter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const PDF_PREFIX: &[u8] = b"%PDF-mock ";

#[derive(Debug, Default)]
pub struct MockConverter {
    calls: AtomicUsize,
    gate: Option<Gate>,
}

/// Rendezvous between a held conversion and the test
#[derive(Debug, Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter that parks each conversion until `gate.release` is notified
    pub fn gated() -> (Self, Gate) {
        let gate = Gate::default();
        let converter = Self {
            calls: AtomicUsize::new(0),
            gate: Some(gate.clone()),
        };
        (converter, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentConverter for MockConverter {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn convert(&self, source: &Path) -> Result<PathBuf, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = output_path_for(source)?;

        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("slow") {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if name.contains("bad") {
            return Err(ConversionError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "source file could not be loaded".to_string(),
            });
        }

        let mut content = PDF_PREFIX.to_vec();
        content.extend(
            tokio::fs::read(source)
                .await
                .map_err(|e| ConversionError::Spawn(e.to_string()))?,
        );
        tokio::fs::write(&output, content)
            .await
            .map_err(|e| ConversionError::Spawn(e.to_string()))?;
        Ok(output)
    }
}
