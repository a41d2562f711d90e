//! The conversion executor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::ConversionError;
use super::fallback::{AttemptOutcome, Fallback};
use crate::classifier::Category;
use crate::converter::{
    CategoryConverter, ConverterConfig, ConverterError, DataConverter, DocumentConverter,
    ImageConverter, MediaConverter, ProcessRunner, Staging, TokioProcessRunner,
};
use crate::job::{ConversionResult, Job};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION, STRATEGY_ATTEMPTS};
use crate::strategy::{self, StrategyVariant};

/// One converter per family. Data and code files share the data converter.
#[derive(Clone)]
pub struct ConverterSet {
    media: Arc<dyn CategoryConverter>,
    image: Arc<dyn CategoryConverter>,
    document: Arc<dyn CategoryConverter>,
    data: Arc<dyn CategoryConverter>,
}

impl ConverterSet {
    /// The built-in converters, running external tools through `runner`.
    pub fn new(config: &ConverterConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            media: Arc::new(MediaConverter::new(config.clone(), Arc::clone(&runner))),
            image: Arc::new(ImageConverter::new(config.clone(), Arc::clone(&runner))),
            document: Arc::new(DocumentConverter::new(config.clone(), Arc::clone(&runner))),
            data: Arc::new(DataConverter::new(config.clone(), runner)),
        }
    }

    /// The built-in converters with real child processes.
    pub fn with_system_tools(config: &ConverterConfig) -> Self {
        Self::new(config, Arc::new(TokioProcessRunner))
    }

    /// The same converter for every category.
    pub fn uniform(converter: Arc<dyn CategoryConverter>) -> Self {
        Self {
            media: Arc::clone(&converter),
            image: Arc::clone(&converter),
            document: Arc::clone(&converter),
            data: converter,
        }
    }

    pub fn with_media(mut self, converter: Arc<dyn CategoryConverter>) -> Self {
        self.media = converter;
        self
    }

    pub fn with_image(mut self, converter: Arc<dyn CategoryConverter>) -> Self {
        self.image = converter;
        self
    }

    pub fn with_document(mut self, converter: Arc<dyn CategoryConverter>) -> Self {
        self.document = converter;
        self
    }

    pub fn with_data(mut self, converter: Arc<dyn CategoryConverter>) -> Self {
        self.data = converter;
        self
    }

    /// Converter responsible for `category`.
    pub fn for_category(&self, category: Category) -> &dyn CategoryConverter {
        match category {
            Category::Media => self.media.as_ref(),
            Category::Image => self.image.as_ref(),
            Category::Document => self.document.as_ref(),
            Category::Data | Category::Code => self.data.as_ref(),
        }
    }
}

/// Runs jobs through their ordered strategy variants.
///
/// Variants of one job run strictly one after another, each in its own
/// staging directory which is removed before the next one starts. Separate
/// jobs may run concurrently.
pub struct Executor {
    staging_root: PathBuf,
    converters: ConverterSet,
}

impl Executor {
    pub fn new(config: &ConverterConfig, converters: ConverterSet) -> Self {
        Self {
            staging_root: config.temp_dir.clone(),
            converters,
        }
    }

    /// Executor with the built-in converters and real child processes.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config, ConverterSet::with_system_tools(config))
    }

    pub fn staging_root(&self) -> &std::path::Path {
        &self.staging_root
    }

    /// Convert `job`, trying variants in order until one succeeds.
    pub async fn execute(&self, job: &Job) -> Result<ConversionResult, ConversionError> {
        let category = job.category.as_str();
        let start = Instant::now();
        let result = self.run_variants(job).await;

        let label = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        CONVERSIONS_TOTAL.with_label_values(&[category, label]).inc();
        CONVERSION_DURATION
            .with_label_values(&[category])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn run_variants(&self, job: &Job) -> Result<ConversionResult, ConversionError> {
        let variants = strategy::variants(
            job.category,
            &job.source_format,
            &job.target_format,
            &job.options,
        )
        .ok_or_else(|| ConversionError::Unsupported {
            category: job.category,
            source_format: job.source_format.clone(),
            target_format: job.target_format.clone(),
        })?;

        let converter = self.converters.for_category(job.category);
        debug!(
            job_id = %job.id,
            converter = converter.name(),
            source = %job.source_format,
            target = %job.target_format,
            variants = variants.len(),
            "Starting conversion"
        );

        let mut fallback = Fallback::new();
        for (attempt, variant) in variants.iter().enumerate() {
            let outcome = self.attempt(converter, job, attempt, variant).await;
            let result = match &outcome {
                AttemptOutcome::Success(_) => "success",
                AttemptOutcome::Failure(err) => {
                    warn!(
                        job_id = %job.id,
                        variant = %variant.label,
                        attempt,
                        error = %err,
                        "Strategy attempt failed"
                    );
                    err.kind()
                }
            };
            STRATEGY_ATTEMPTS
                .with_label_values(&[job.category.as_str(), result])
                .inc();
            if fallback.record(&variant.label, outcome).is_break() {
                break;
            }
        }

        let attempts = fallback.attempts();
        match fallback.finish() {
            Ok((variant, output)) => {
                info!(
                    job_id = %job.id,
                    variant = %variant,
                    attempts,
                    bytes = output.artifact.len(),
                    "Conversion completed"
                );
                Ok(ConversionResult {
                    job_id: job.id.clone(),
                    output_name: job.output_name(),
                    artifact: output.artifact,
                    details: output.details,
                    preview_url: output.preview_url,
                })
            }
            Err(err) => {
                warn!(job_id = %job.id, attempts, error = %err, "Conversion failed");
                Err(err)
            }
        }
    }

    /// One variant in a fresh staging directory, released on every path.
    async fn attempt(
        &self,
        converter: &dyn CategoryConverter,
        job: &Job,
        attempt: usize,
        variant: &StrategyVariant,
    ) -> AttemptOutcome {
        let staging = match Staging::prepare(&self.staging_root, job, attempt).await {
            Ok(staging) => staging,
            Err(err) => return AttemptOutcome::Failure(err),
        };
        debug!(
            job_id = %job.id,
            variant = %variant.label,
            attempt,
            dir = %staging.dir().display(),
            "Running strategy"
        );

        let result = converter.attempt(job, variant, &staging).await;

        let dir = staging.dir().to_path_buf();
        match tokio::task::spawn_blocking(move || staging.release()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(dir = %dir.display(), error = %err, "Failed to remove staging"),
            Err(err) => warn!(dir = %dir.display(), error = %err, "Staging cleanup task failed"),
        }

        match result {
            Ok(output) if output.artifact.is_empty() => {
                AttemptOutcome::Failure(ConverterError::encode("converter produced no bytes"))
            }
            other => other.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::job::{ConversionOptions, SourceFile};
    use crate::testing::ScriptedConverter;

    fn job(name: &str, target: &str) -> Job {
        let source = SourceFile::new(name, "", b"input".to_vec());
        let classification = classify(&source).unwrap();
        Job::new(source, &classification, ConversionOptions::new(target))
    }

    fn executor(root: &std::path::Path, converter: Arc<ScriptedConverter>) -> Executor {
        let config = ConverterConfig::default().with_temp_dir(root.to_path_buf());
        Executor::new(&config, ConverterSet::uniform(converter))
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_not_attempted() {
        let root = tempfile::tempdir().unwrap();
        let converter = Arc::new(ScriptedConverter::new());
        let executor = executor(root.path(), Arc::clone(&converter));

        let err = executor.execute(&job("photo.png", "mp3")).await.unwrap_err();
        assert!(matches!(err, ConversionError::Unsupported { .. }));
        assert!(converter.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_second_variant() {
        let root = tempfile::tempdir().unwrap();
        let converter = Arc::new(ScriptedConverter::new().fail("mp3-vbr"));
        let executor = executor(root.path(), Arc::clone(&converter));

        let job = job("clip.mp4", "mp3");
        let result = executor.execute(&job).await.unwrap();
        assert_eq!(result.output_name, "clip.mp3");
        assert_eq!(result.job_id, job.id);
        assert_eq!(converter.labels(), vec!["mp3-vbr", "mp3-cbr"]);
    }

    #[tokio::test]
    async fn test_empty_output_counts_as_failure() {
        let root = tempfile::tempdir().unwrap();
        let converter = Arc::new(ScriptedConverter::new().empty("mp3-vbr"));
        let executor = executor(root.path(), Arc::clone(&converter));

        let result = executor.execute(&job("clip.mp4", "mp3")).await.unwrap();
        assert_eq!(result.details.as_deref(), Some("mp3-cbr"));
    }

    #[tokio::test]
    async fn test_staging_removed_after_each_attempt() {
        let root = tempfile::tempdir().unwrap();
        let converter = Arc::new(ScriptedConverter::new().fail("mp3-vbr").fail("mp3-cbr"));
        let executor = executor(root.path(), Arc::clone(&converter));

        executor.execute(&job("clip.mp4", "mp3")).await.unwrap_err();

        let staged = converter.staged_dirs();
        assert_eq!(staged.len(), 2);
        assert_ne!(staged[0], staged[1]);
        for dir in staged {
            assert!(!dir.exists(), "{} still exists", dir.display());
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
