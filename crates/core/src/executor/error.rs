//! Errors surfaced to the job caller.

use thiserror::Error;

use crate::classifier::Category;
use crate::converter::ConverterError;

/// Why a job produced no result.
///
/// Individual attempt failures never appear here on their own: they are
/// absorbed by the fallback loop, and only the last one is reported once
/// every variant has failed.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// No strategy exists for the pair. Not retried.
    #[error("Unsupported conversion: {category} {source_format} to {target_format}")]
    Unsupported {
        category: Category,
        source_format: String,
        target_format: String,
    },

    /// Every strategy variant failed.
    #[error("Conversion failed after {attempts} attempt(s), last strategy {variant}: {cause}")]
    Failed {
        attempts: usize,
        variant: String,
        #[source]
        cause: ConverterError,
    },
}

impl ConversionError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported { .. } => "unsupported",
            Self::Failed { .. } => "failed",
        }
    }

    /// The last attempt's error, when there was one.
    pub fn cause(&self) -> Option<&ConverterError> {
        match self {
            Self::Unsupported { .. } => None,
            Self::Failed { cause, .. } => Some(cause),
        }
    }
}
