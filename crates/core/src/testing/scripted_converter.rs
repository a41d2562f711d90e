//! Scripted category converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::classifier::mime_for;
use crate::converter::{CategoryConverter, ConverterError, Staging};
use crate::job::{Artifact, ConverterOutput, Job};
use crate::strategy::StrategyVariant;

/// A recorded attempt for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAttempt {
    pub job_id: String,
    /// Label of the variant that was run.
    pub variant: String,
    /// Staging directory the attempt ran in.
    pub staging_dir: PathBuf,
    /// Whether the input had been staged when the attempt started.
    pub input_staged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    Fail,
    Unavailable,
    Empty,
}

/// Converter whose outcome is scripted per variant label.
///
/// Unscripted variants succeed. A successful attempt returns the variant
/// label as both the artifact bytes and the details, with the MIME type of
/// the job's target. Failures mention the label, so tests can tell which
/// attempt's error was surfaced.
///
/// # Example
///
/// ```rust,ignore
/// use archlight_core::testing::ScriptedConverter;
///
/// let converter = Arc::new(ScriptedConverter::new().fail("mp3-vbr"));
/// let executor = Executor::new(&config, ConverterSet::uniform(converter.clone()));
///
/// let result = executor.execute(&job).await?;
/// assert_eq!(converter.labels(), vec!["mp3-vbr", "mp3-cbr"]);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedConverter {
    scripts: HashMap<String, Behaviour>,
    delay: Option<Duration>,
    attempts: Mutex<Vec<RecordedAttempt>>,
}

impl ScriptedConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `label` fails with a tool error.
    pub fn fail(mut self, label: &str) -> Self {
        self.scripts.insert(label.to_string(), Behaviour::Fail);
        self
    }

    /// `label` fails because a resource is missing.
    pub fn unavailable(mut self, label: &str) -> Self {
        self.scripts.insert(label.to_string(), Behaviour::Unavailable);
        self
    }

    /// `label` returns an empty artifact.
    pub fn empty(mut self, label: &str) -> Self {
        self.scripts.insert(label.to_string(), Behaviour::Empty);
        self
    }

    /// Every attempt sleeps this long first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedAttempt>> {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded attempts.
    pub fn attempts(&self) -> Vec<RecordedAttempt> {
        self.recorded().clone()
    }

    /// Labels of the recorded attempts, in order.
    pub fn labels(&self) -> Vec<String> {
        self.recorded().iter().map(|a| a.variant.clone()).collect()
    }

    /// Staging directories of the recorded attempts, in order.
    pub fn staged_dirs(&self) -> Vec<PathBuf> {
        self.recorded().iter().map(|a| a.staging_dir.clone()).collect()
    }

    /// Clear recorded attempts.
    pub fn clear_recorded(&self) {
        self.recorded().clear();
    }
}

#[async_trait]
impl CategoryConverter for ScriptedConverter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError> {
        self.recorded().push(RecordedAttempt {
            job_id: job.id.clone(),
            variant: variant.label.clone(),
            staging_dir: staging.dir().to_path_buf(),
            input_staged: staging.input().exists(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let label = variant.label.as_str();
        let mime = mime_for(&job.target_format);
        match self.scripts.get(label).copied().unwrap_or(Behaviour::Succeed) {
            Behaviour::Succeed => Ok(ConverterOutput::new(Artifact::new(
                label.as_bytes().to_vec(),
                mime,
            ))
            .with_details(label)),
            Behaviour::Empty => Ok(ConverterOutput::new(Artifact::new(Vec::new(), mime))),
            Behaviour::Fail => Err(ConverterError::tool_failed(
                "scripted",
                format!("{} failed", label),
                None,
            )),
            Behaviour::Unavailable => Err(ConverterError::resource_unavailable(format!(
                "{} needs a missing resource",
                label
            ))),
        }
    }
}
