//! Error types for audiox-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioxError>;

#[derive(Error, Debug)]
pub enum AudioxError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Failed to parse probe output: {0}")]
    ProbeParse(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioxError {
    /// Diagnostic text reported by the external tool, if it ran and failed
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            AudioxError::Process(ProcessError::Failed { message, .. }) => Some(message),
            _ => None,
        }
    }
}

/// Failures starting or running the external binary
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{} not found. Install with: brew install ffmpeg", .program.display())]
    NotFound { program: PathBuf },

    #[error("Failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} failed with exit code {}: {}", .program.display(), exit_code(.code), summary(.message))]
    Failed {
        program: PathBuf,
        code: Option<i32>,
        /// Relevant stderr lines, see [`crate::diagnostics::extract_error`]
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

// Last non-blank line: with a banner first, the actual error comes last.
fn summary(message: &str) -> &str {
    message
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no diagnostic output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_display_is_single_line() {
        let err = ProcessError::Failed {
            program: PathBuf::from("ffmpeg"),
            code: Some(1),
            message: "ffmpeg version 7.0\nError opening input files: No such file or directory\n"
                .to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ffmpeg failed with exit code 1: Error opening input files: No such file or directory"
        );
    }

    #[test]
    fn test_failed_display_without_diagnostics() {
        let err = ProcessError::Failed {
            program: PathBuf::from("ffprobe"),
            code: None,
            message: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "ffprobe failed with exit code none (terminated by signal): no diagnostic output"
        );
    }

    #[test]
    fn test_diagnostics_accessor() {
        let err: AudioxError = ProcessError::Failed {
            program: PathBuf::from("ffmpeg"),
            code: Some(1),
            message: "Unknown encoder 'nope'".to_string(),
        }
        .into();
        assert_eq!(err.diagnostics(), Some("Unknown encoder 'nope'"));
        assert!(AudioxError::ProbeParse("x".into()).diagnostics().is_none());
    }
}
