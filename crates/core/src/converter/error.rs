//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single strategy attempt.
///
/// The executor never surfaces these directly; it moves on to the next
/// variant and only reports the last one if every variant fails.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// External tool binary not found.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: String, path: PathBuf },

    /// External tool exited unsuccessfully.
    #[error("{tool} failed: {reason}")]
    ToolFailed {
        tool: String,
        reason: String,
        stderr: Option<String>,
    },

    /// External tool exceeded its time budget and was killed.
    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: String, timeout_secs: u64 },

    /// A resource the recipe needs is missing from this environment.
    #[error("Resource unavailable: {reason}")]
    ResourceUnavailable { reason: String },

    /// Input could not be parsed.
    #[error("Failed to decode input: {reason}")]
    Decode { reason: String },

    /// Output could not be produced.
    #[error("Failed to encode output: {reason}")]
    Encode { reason: String },

    /// Input parsed but cannot be represented in the target format.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The recipe belongs to another converter family.
    #[error("{converter} converter cannot run {family} recipes")]
    UnsupportedRecipe { converter: String, family: String },

    /// Scratch directory could not be prepared.
    #[error("Failed to stage attempt: {reason}")]
    Staging { reason: String },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a tool failure with captured stderr.
    pub fn tool_failed(
        tool: impl Into<String>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
            stderr,
        }
    }

    pub fn resource_unavailable(reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn staging(reason: impl Into<String>) -> Self {
        Self::Staging {
            reason: reason.into(),
        }
    }

    pub fn unsupported_recipe(converter: impl Into<String>, family: impl Into<String>) -> Self {
        Self::UnsupportedRecipe {
            converter: converter.into(),
            family: family.into(),
        }
    }

    /// Whether the failure points at the environment rather than the input.
    pub fn is_resource_unavailable(&self) -> bool {
        matches!(
            self,
            Self::ResourceUnavailable { .. } | Self::ToolNotFound { .. }
        )
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolNotFound { .. } => "tool_not_found",
            Self::ToolFailed { .. } => "tool_failed",
            Self::Timeout { .. } => "timeout",
            Self::ResourceUnavailable { .. } => "resource_unavailable",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::InvalidInput { .. } => "invalid_input",
            Self::UnsupportedRecipe { .. } => "unsupported_recipe",
            Self::Staging { .. } => "staging",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_tool() {
        let err = ConverterError::tool_failed("ffmpeg", "exit code 1", None);
        assert_eq!(err.to_string(), "ffmpeg failed: exit code 1");

        let err = ConverterError::Timeout {
            tool: "pdftotext".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "pdftotext timed out after 30 seconds");
    }

    #[test]
    fn test_resource_unavailable_classification() {
        assert!(ConverterError::resource_unavailable("no lavfi").is_resource_unavailable());
        assert!(ConverterError::ToolNotFound {
            tool: "vtracer".to_string(),
            path: PathBuf::from("vtracer"),
        }
        .is_resource_unavailable());
        assert!(!ConverterError::decode("bad png").is_resource_unavailable());
    }
}
