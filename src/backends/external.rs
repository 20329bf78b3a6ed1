//! External CLI tier
//!
//! Wraps the `backgroundremover` command-line tool. The input image is
//! written to a scoped temporary file, the tool is invoked with input and
//! output paths under a hard timeout, and the output file is read back.
//! Both temporary files are owned by RAII handles, so they are deleted on
//! every exit path including timeout and non-zero exit.

use crate::backends::SegmentationBackend;
use crate::error::{RemovalError, Result};
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the CLI binary path
pub const BINARY_ENV: &str = "BACKGROUNDREMOVER_BIN";

const BINARY_NAME: &str = "backgroundremover";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Subprocess-backed segmentation tier.
pub struct ExternalCliBackend {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl ExternalCliBackend {
    /// Resolve the binary from the environment: `BACKGROUNDREMOVER_BIN` if
    /// set, otherwise a PATH search for `backgroundremover`.
    #[must_use]
    pub fn from_env() -> Self {
        let binary = std::env::var_os(BINARY_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .or_else(|| find_in_path(BINARY_NAME));
        Self {
            binary,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use an explicit binary path.
    #[must_use]
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            binary: Some(binary),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the subprocess timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn binary(&self) -> Result<&Path> {
        self.binary.as_deref().ok_or_else(|| {
            RemovalError::unavailable(format!("{BINARY_NAME} binary not found on PATH"))
        })
    }
}

#[async_trait]
impl SegmentationBackend for ExternalCliBackend {
    fn id(&self) -> &str {
        "backgroundremover"
    }

    fn label(&self) -> &str {
        "BackgroundRemover - External CLI"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    async fn segment(&self, image: &DynamicImage) -> Result<RgbaImage> {
        let binary = self.binary()?;

        // Scoped temp files: dropped (and unlinked) on every return path
        let input = tempfile::Builder::new()
            .prefix("bgremove-in-")
            .suffix(".png")
            .tempfile()?;
        let output = tempfile::Builder::new()
            .prefix("bgremove-out-")
            .suffix(".png")
            .tempfile()?;

        image
            .save_with_format(input.path(), image::ImageFormat::Png)
            .map_err(|e| RemovalError::backend(format!("failed to stage input: {e}")))?;

        debug!(binary = %binary.display(), "invoking external segmentation tool");
        let mut command = tokio::process::Command::new(binary);
        command
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output.path())
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                RemovalError::backend(format!(
                    "{BINARY_NAME} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| RemovalError::backend(format!("failed to spawn {BINARY_NAME}: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RemovalError::backend(format!(
                "{BINARY_NAME} exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let processed = image::open(output.path())
            .map_err(|e| RemovalError::backend(format!("failed to read {BINARY_NAME} output: {e}")))?;
        Ok(processed.to_rgba8())
    }
}

/// Minimal PATH lookup, the moral equivalent of `which`.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let backend = ExternalCliBackend {
            binary: None,
            timeout: DEFAULT_TIMEOUT,
        };
        assert!(!backend.is_available());
        assert!(matches!(
            backend.binary(),
            Err(RemovalError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn test_explicit_binary_is_available() {
        let backend = ExternalCliBackend::with_binary(PathBuf::from("/bin/true"));
        assert!(backend.is_available());
        assert_eq!(backend.id(), "backgroundremover");
    }
}
