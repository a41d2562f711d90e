//! FFmpeg-based media converter.

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::capabilities::{Transcoder, TranscoderHandle};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::ProcessRunner;
use super::staging::Staging;
use super::traits::CategoryConverter;
use crate::classifier::mime_for;
use crate::job::{Artifact, ConverterOutput, Job};
use crate::strategy::{MediaRecipe, Recipe, StrategyVariant};

/// Audio and video conversions through ffmpeg.
pub struct MediaConverter {
    config: ConverterConfig,
    runner: Arc<dyn ProcessRunner>,
    transcoder: TranscoderHandle,
}

impl MediaConverter {
    pub fn new(config: ConverterConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let transcoder = TranscoderHandle::new(config.ffmpeg_path.clone(), config.timeout());
        Self {
            config,
            runner,
            transcoder,
        }
    }

    /// The lazily probed ffmpeg handle.
    pub fn transcoder(&self) -> &TranscoderHandle {
        &self.transcoder
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-y".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]
    }

    async fn run(&self, transcoder: &Transcoder, args: Vec<String>) -> Result<(), ConverterError> {
        self.runner
            .run(&transcoder.path, &args, self.config.timeout())
            .await
            .map(|_| ())
    }

    async fn transcode(
        &self,
        transcoder: &Transcoder,
        staging: &Staging,
        extra: &[String],
        output: &Path,
    ) -> Result<(), ConverterError> {
        let mut args = self.base_args();
        args.extend(["-i".to_string(), path_arg(staging.input())]);
        args.extend(extra.iter().cloned());
        args.push(path_arg(output));
        self.run(transcoder, args).await
    }

    /// Stage one: ffmpeg generates the background itself.
    async fn mux_over_generated(
        &self,
        transcoder: &Transcoder,
        staging: &Staging,
        extra: &[String],
        output: &Path,
    ) -> Result<(), ConverterError> {
        if !transcoder.capabilities.can_generate_background() {
            return Err(ConverterError::resource_unavailable(
                "ffmpeg lacks the lavfi colour source",
            ));
        }

        let (width, height) = self.config.background_dimensions();
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "color=c={}:s={}x{}:r=1",
                self.config.background_color, width, height
            ),
            "-i".to_string(),
            path_arg(staging.input()),
        ]);
        args.extend(extra.iter().cloned());
        args.extend(["-shortest".to_string(), path_arg(output)]);

        self.run(transcoder, args).await.map_err(|e| match e {
            ConverterError::ToolFailed {
                stderr: Some(ref stderr),
                ..
            } if generator_missing(stderr) => {
                ConverterError::resource_unavailable(format!("colour source rejected: {}", stderr))
            }
            other => other,
        })
    }

    /// Stage two: loop a rasterized still picture instead.
    async fn mux_over_still(
        &self,
        transcoder: &Transcoder,
        staging: &Staging,
        extra: &[String],
        output: &Path,
    ) -> Result<(), ConverterError> {
        let (width, height) = self.config.background_dimensions();
        let color = self.config.background_rgb().unwrap_or([0, 0, 0]);
        let still = staging.path("background.png");
        let still_path = still.clone();

        tokio::task::spawn_blocking(move || {
            RgbImage::from_pixel(width, height, Rgb(color))
                .save_with_format(&still_path, image::ImageFormat::Png)
        })
        .await
        .map_err(|e| ConverterError::encode(e.to_string()))?
        .map_err(|e| ConverterError::encode(format!("background picture: {}", e)))?;

        let mut args = self.base_args();
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            "1".to_string(),
            "-i".to_string(),
            path_arg(&still),
            "-i".to_string(),
            path_arg(staging.input()),
        ]);
        args.extend(extra.iter().cloned());
        args.extend(["-shortest".to_string(), path_arg(output)]);
        self.run(transcoder, args).await
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// ffmpeg's complaints when lavfi or the colour filter is compiled out.
fn generator_missing(stderr: &str) -> bool {
    stderr.contains("Unknown input format: 'lavfi'")
        || stderr.contains("No such filter: 'color'")
        || stderr.contains("Unknown input format 'lavfi'")
}

#[async_trait]
impl CategoryConverter for MediaConverter {
    fn name(&self) -> &str {
        "media"
    }

    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError> {
        let recipe = match &variant.recipe {
            Recipe::Media(recipe) => recipe,
            other => return Err(ConverterError::unsupported_recipe(self.name(), other.family())),
        };

        let transcoder = self.transcoder.acquire(self.runner.as_ref()).await?;
        let output = staging.output(&job.target_format);

        match recipe {
            MediaRecipe::Transcode { args } => {
                self.transcode(&transcoder, staging, args, &output).await?
            }
            MediaRecipe::AudioOverBackground { args } => {
                match self
                    .mux_over_generated(&transcoder, staging, args, &output)
                    .await
                {
                    Err(e) if e.is_resource_unavailable() => {
                        warn!(
                            job_id = %job.id,
                            variant = %variant.label,
                            error = %e,
                            "Generated background unavailable, using a still picture"
                        );
                        self.mux_over_still(&transcoder, staging, args, &output)
                            .await?
                    }
                    other => other?,
                }
            }
        }

        let bytes = tokio::fs::read(&output).await.map_err(|_| {
            ConverterError::tool_failed("ffmpeg", "output file not created", None)
        })?;
        if bytes.is_empty() {
            return Err(ConverterError::tool_failed("ffmpeg", "output file is empty", None));
        }
        debug!(job_id = %job.id, size = bytes.len(), "Media output ready");

        Ok(
            ConverterOutput::new(Artifact::new(bytes, mime_for(&job.target_format))).with_details(
                format!(
                    "{} → {}",
                    job.source_format.to_uppercase(),
                    job.target_format.to_uppercase()
                ),
            ),
        )
    }
}
