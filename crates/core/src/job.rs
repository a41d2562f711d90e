//! Conversion jobs and their results.
//!
//! A [`Job`] is created once the user commits to a target format. It is
//! immutable and consumed by exactly one executor run, which produces at most
//! one [`ConversionResult`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::classifier::{normalize_format, Category, Classification};

/// A locally selected input file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name as selected by the user, extension included.
    pub name: String,
    /// Media type reported by the picker; may be empty.
    pub declared_type: String,
    /// Raw file contents.
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercase extension after the last dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

/// User-facing conversion settings.
///
/// `metadata` carries category-specific tuning (for example vectorization
/// sliders) and is handed to the strategy tables untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub target_format: String,
    /// 0-100; only lossy image and audio encodes look at it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    #[serde(default = "default_maintain_aspect_ratio")]
    pub maintain_aspect_ratio: bool,
    /// Trades a little JPEG quality for size.
    #[serde(default)]
    pub smart_compression: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn default_maintain_aspect_ratio() -> bool {
    true
}

impl ConversionOptions {
    pub fn new(target_format: impl Into<String>) -> Self {
        Self {
            target_format: target_format.into(),
            quality: None,
            maintain_aspect_ratio: default_maintain_aspect_ratio(),
            smart_compression: false,
            bitrate_kbps: None,
            frame_rate: None,
            width: None,
            height: None,
            metadata: None,
        }
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_smart_compression(mut self, enabled: bool) -> Self {
        self.smart_compression = enabled;
        self
    }

    pub fn with_bitrate(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A committed conversion request.
#[derive(Debug, Clone)]
pub struct Job {
    /// Random, globally unique job id.
    pub id: String,
    pub source: SourceFile,
    pub category: Category,
    /// Canonical source format, as classified.
    pub source_format: String,
    /// Canonical target format.
    pub target_format: String,
    pub options: ConversionOptions,
}

impl Job {
    pub fn new(
        source: SourceFile,
        classification: &Classification,
        options: ConversionOptions,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_format: normalize_format(&options.target_format),
            category: classification.category,
            source_format: classification.source_format.clone(),
            source,
            options,
        }
    }

    /// Name offered for download: source base name plus target extension.
    pub fn output_name(&self) -> String {
        build_output_name(&self.source.name, &self.target_format)
    }
}

/// Replace the extension of `name` with the canonical one of `target_format`.
///
/// Only the last dot-separated segment is dropped, so `report.final.docx`
/// becomes `report.final.pdf`. Names without a usable base keep their full
/// text.
pub fn build_output_name(name: &str, target_format: &str) -> String {
    let base = match name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => name,
    };
    format!("{}.{}", base, normalize_format(target_format))
}

/// A produced blob with its declared MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub mime: String,
}

impl Artifact {
    pub fn new(bytes: impl Into<Bytes>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a single successful strategy attempt hands back.
#[derive(Debug, Clone)]
pub struct ConverterOutput {
    pub artifact: Artifact,
    pub details: Option<String>,
    pub preview_url: Option<String>,
}

impl ConverterOutput {
    pub fn new(artifact: Artifact) -> Self {
        Self {
            artifact,
            details: None,
            preview_url: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_preview_url(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }
}

/// Result of a successful job.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub job_id: String,
    pub artifact: Artifact,
    pub output_name: String,
    pub details: Option<String>,
    pub preview_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name_keeps_inner_dots() {
        assert_eq!(
            build_output_name("report.final.docx", "pdf"),
            "report.final.pdf"
        );
    }

    #[test]
    fn test_output_name_uses_canonical_extension() {
        assert_eq!(build_output_name("photo.png", "JPEG"), "photo.jpg");
        assert_eq!(build_output_name("config.json", "yml"), "config.yaml");
    }

    #[test]
    fn test_output_name_only_extension_changes() {
        let a = build_output_name("holiday clip.mp4", "mp3");
        let b = build_output_name("holiday clip.mp4", "gif");
        assert_eq!(a.strip_suffix(".mp3"), b.strip_suffix(".gif"));
    }

    #[test]
    fn test_output_name_without_extension() {
        assert_eq!(build_output_name("README", "pdf"), "README.pdf");
        assert_eq!(build_output_name(".bashrc", "txt"), ".bashrc.txt");
    }

    #[test]
    fn test_source_extension() {
        let file = SourceFile::new("Scan.PDF", "", Vec::new());
        assert_eq!(file.extension().as_deref(), Some("pdf"));
        assert_eq!(SourceFile::new("noext", "", Vec::new()).extension(), None);
        assert_eq!(SourceFile::new("trailing.", "", Vec::new()).extension(), None);
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: ConversionOptions =
            serde_json::from_str(r#"{"target_format":"png"}"#).unwrap();
        assert!(options.maintain_aspect_ratio);
        assert!(!options.smart_compression);
        assert_eq!(options.quality, None);
    }
}
