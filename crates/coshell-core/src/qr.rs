//! QR code rendering.
//!
//! Rendering is delegated to an external program (`qrencode` by default)
//! which writes text art to stdout. The path is passed as a single argument,
//! never through a shell.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::config::QrConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while rendering a QR code.
#[derive(Debug, Error)]
pub enum QrError {
    /// No path was given.
    #[error("no file path given")]
    EmptyPath,

    /// The renderer program could not be started.
    #[error("failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The renderer ran but exited unsuccessfully.
    #[error("{program} failed: {stderr}")]
    Failed { program: String, stderr: String },
}

// ============================================================================
// Renderer
// ============================================================================

/// Turns a file path into lines of text art.
pub trait QrRenderer {
    fn render(&self, path: &str) -> Result<Vec<String>, QrError>;
}

/// Renders through the `qrencode` command line tool.
#[derive(Debug, Clone)]
pub struct QrEncode {
    program: String,
    format: String,
}

impl QrEncode {
    pub fn new(program: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    pub fn from_config(config: &QrConfig) -> Self {
        Self::new(config.program.clone(), config.format.clone())
    }

    /// Arguments passed to the program for `path`.
    ///
    /// `--` ends option parsing so a path starting with `-` stays a path.
    fn args<'a>(&'a self, path: &'a str) -> [&'a str; 6] {
        ["-t", self.format.as_str(), "-o", "-", "--", path]
    }
}

impl Default for QrEncode {
    fn default() -> Self {
        Self::from_config(&QrConfig::default())
    }
}

impl QrRenderer for QrEncode {
    fn render(&self, path: &str) -> Result<Vec<String>, QrError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(QrError::EmptyPath);
        }

        debug!(program = %self.program, path, "Rendering QR code");

        let output = Command::new(&self.program)
            .args(self.args(path))
            .output()
            .map_err(|e| QrError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(QrError::Failed {
                program: self.program.clone(),
                stderr: stderr.trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().map(str::to_string).collect())
    }
}
