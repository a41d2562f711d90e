//! Lazily validated ffmpeg handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::ConverterError;
use super::process::ProcessRunner;

/// What the installed ffmpeg can do, as far as the media recipes care.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscoderCapabilities {
    /// The `lavfi` virtual input device is compiled in.
    pub lavfi: bool,
    /// The `color` source filter is available.
    pub color_source: bool,
}

impl TranscoderCapabilities {
    /// Parse `ffmpeg -hide_banner -filters` and `-formats` listings.
    pub fn from_listings(filters: &str, formats: &str) -> Self {
        let second_column = |listing: &str, name: &str| {
            listing
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(name))
        };
        Self {
            lavfi: second_column(formats, "lavfi"),
            color_source: second_column(filters, "color"),
        }
    }

    /// Whether a solid colour background can be generated in-process.
    pub fn can_generate_background(&self) -> bool {
        self.lavfi && self.color_source
    }
}

/// A validated ffmpeg binary.
#[derive(Debug, Clone)]
pub struct Transcoder {
    pub path: PathBuf,
    /// First line of `ffmpeg -version`.
    pub version: String,
    pub capabilities: TranscoderCapabilities,
}

/// Owns the transcoder for a media converter.
///
/// The binary is probed on first use and the result kept until
/// [`TranscoderHandle::reset`]. A failed probe is not cached, so a later
/// attempt probes again.
pub struct TranscoderHandle {
    path: PathBuf,
    probe_timeout: Duration,
    slot: Mutex<Option<Arc<Transcoder>>>,
}

impl TranscoderHandle {
    pub fn new(path: PathBuf, probe_timeout: Duration) -> Self {
        Self {
            path,
            probe_timeout,
            slot: Mutex::new(None),
        }
    }

    /// Return the transcoder, probing the binary if needed.
    pub async fn acquire(
        &self,
        runner: &dyn ProcessRunner,
    ) -> Result<Arc<Transcoder>, ConverterError> {
        let mut slot = self.slot.lock().await;
        if let Some(transcoder) = slot.as_ref() {
            return Ok(Arc::clone(transcoder));
        }

        let version = runner
            .run(&self.path, &["-version".to_string()], self.probe_timeout)
            .await?;
        let version = String::from_utf8_lossy(&version.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();

        let listing = |flag: &str| {
            let args = vec!["-hide_banner".to_string(), flag.to_string()];
            async move {
                runner
                    .run(&self.path, &args, self.probe_timeout)
                    .await
                    .map(|out| String::from_utf8_lossy(&out.stdout).to_string())
                    .unwrap_or_default()
            }
        };
        let filters = listing("-filters").await;
        let formats = listing("-formats").await;
        let capabilities = TranscoderCapabilities::from_listings(&filters, &formats);

        info!(
            path = %self.path.display(),
            version = %version,
            generated_background = capabilities.can_generate_background(),
            "Transcoder ready"
        );

        let transcoder = Arc::new(Transcoder {
            path: self.path.clone(),
            version,
            capabilities,
        });
        *slot = Some(Arc::clone(&transcoder));
        Ok(transcoder)
    }

    /// Forget the probed transcoder.
    pub async fn reset(&self) {
        debug!(path = %self.path.display(), "Resetting transcoder");
        *self.slot.lock().await = None;
    }

    pub async fn is_ready(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
