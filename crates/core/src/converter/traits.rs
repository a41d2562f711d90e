//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::staging::Staging;
use crate::job::{ConverterOutput, Job};
use crate::strategy::StrategyVariant;

/// A category converter: runs one strategy variant for a job.
///
/// Implementations keep every intermediate file inside `staging`, which the
/// executor removes after the attempt whatever its outcome.
#[async_trait]
pub trait CategoryConverter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Runs a single attempt.
    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError>;
}
