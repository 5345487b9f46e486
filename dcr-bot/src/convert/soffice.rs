//! LibreOffice headless converter
//!
//! Runs `soffice --headless --convert-to pdf --outdir <dir> <source>`.
//! LibreOffice refuses to run two instances against one user profile, so
//! every invocation gets a throwaway profile inside the source's scratch
//! directory, removed once the process exits.
//!
//! The launcher forks `soffice.bin` to do the work, so each run gets its own
//! process group and an abandoned conversion kills the whole group.

use super::{output_path_for, ConversionError, DocumentConverter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Profile directory name created next to the source file
const PROFILE_DIR: &str = ".lo-profile";

/// Longest stderr excerpt carried into the error message
const STDERR_EXCERPT_CHARS: usize = 400;

/// Converter backed by a LibreOffice executable
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    command: String,
}

impl SofficeConverter {
    /// `command` is the executable name or path (`soffice`, `libreoffice`, ...)
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn build_command(&self, source: &Path, out_dir: &Path, profile: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .arg("--headless")
            .arg("--convert-to")
            .arg(super::TARGET_EXTENSION)
            .arg("--outdir")
            .arg(out_dir)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future (timeout) must not leave soffice running
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn run(
        &self,
        source: &Path,
        out_dir: &Path,
        profile: &Path,
    ) -> std::io::Result<std::process::Output> {
        let child = self.build_command(source, out_dir, profile).spawn()?;
        let mut group = ProcessGroupGuard { pgid: child.id() };
        let output = child.wait_with_output().await;
        group.disarm();
        output
    }
}

/// Kills the child's process group unless disarmed after a normal exit
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let status = std::process::Command::new("kill")
        .args(["-s", "KILL", "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => debug!(pgid, "Killed abandoned LibreOffice process group"),
        Ok(status) => debug!(pgid, status = %status, "LibreOffice process group already gone"),
        Err(e) => warn!(pgid, error = %e, "Failed to kill LibreOffice process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    fn name(&self) -> &'static str {
        "soffice"
    }

    async fn convert(&self, source: &Path) -> Result<PathBuf, ConversionError> {
        let output_path = output_path_for(source)?;
        let out_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let profile = out_dir.join(PROFILE_DIR);

        debug!(
            source = %source.display(),
            command = %self.command,
            "Running LibreOffice conversion"
        );

        let result = self.run(source, &out_dir, &profile).await;

        if let Err(e) = tokio::fs::remove_dir_all(&profile).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(profile = %profile.display(), error = %e, "Failed to remove LibreOffice profile");
            }
        }

        let output = result.map_err(|e| ConversionError::Spawn(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                stderr: excerpt,
            });
        }

        // soffice exits 0 even when it silently skips a file it cannot load
        match tokio::fs::try_exists(&output_path).await {
            Ok(true) => Ok(output_path),
            _ => Err(ConversionError::MissingOutput(output_path.display().to_string())),
        }
    }
}
