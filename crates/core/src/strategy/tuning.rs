//! Numeric tuning shared by the strategy tables.

use serde::Deserialize;

/// Lame VBR index used when no bitrate is requested.
pub const DEFAULT_AUDIO_QUALITY_INDEX: u8 = 2;

/// Normalized image quality used when none is requested.
pub const DEFAULT_IMAGE_QUALITY: f32 = 0.92;

/// Floor applied by smart compression.
pub const SMART_COMPRESSION_FLOOR: f32 = 0.6;

/// Map a requested bitrate to a VBR quality index: `round(kbps / 32)` in `1..=9`.
pub fn audio_quality_index(bitrate_kbps: Option<u32>) -> u8 {
    match bitrate_kbps {
        Some(kbps) if kbps > 0 => (f64::from(kbps) / 32.0).round().clamp(1.0, 9.0) as u8,
        _ => DEFAULT_AUDIO_QUALITY_INDEX,
    }
}

/// Normalize a 0-100 quality to `[0.01, 1.0]`.
pub fn normalize_quality(quality: Option<u32>) -> f32 {
    match quality {
        Some(q) => (q as f32 / 100.0).clamp(0.01, 1.0),
        None => DEFAULT_IMAGE_QUALITY,
    }
}

/// Quality for a lossy image encode of `target_format`.
///
/// Smart compression only affects JPEG output.
pub fn image_quality(quality: Option<u32>, smart_compression: bool, target_format: &str) -> f32 {
    let quality = normalize_quality(quality);
    if smart_compression && target_format == "jpg" {
        (quality - 0.1).max(SMART_COMPRESSION_FLOOR)
    } else {
        quality
    }
}

/// User-facing vectorization sliders, read from job metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VectorizeSettings {
    /// Palette size, 2-64.
    pub colors: u32,
    /// 1-10, higher traces finer.
    pub detail: u32,
    /// 0-10, higher simplifies paths more.
    pub smoothing: u32,
    /// 0-10 pre-trace blur.
    pub blur: u32,
}

impl Default for VectorizeSettings {
    fn default() -> Self {
        Self {
            colors: 16,
            detail: 6,
            smoothing: 3,
            blur: 0,
        }
    }
}

impl VectorizeSettings {
    /// Read sliders from `metadata` (top level or under `vectorize`).
    ///
    /// Missing or malformed values fall back to the defaults; everything is
    /// clamped to the slider ranges.
    pub fn from_metadata(metadata: Option<&serde_json::Value>) -> Self {
        let settings = metadata
            .map(|m| m.get("vectorize").unwrap_or(m))
            .and_then(|m| serde_json::from_value::<Self>(m.clone()).ok())
            .unwrap_or_default();
        settings.clamped()
    }

    fn clamped(self) -> Self {
        Self {
            colors: self.colors.clamp(2, 64),
            detail: self.detail.clamp(1, 10),
            smoothing: self.smoothing.min(10),
            blur: self.blur.min(10),
        }
    }
}

/// Tracer parameters derived from [`VectorizeSettings`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceParams {
    /// Error threshold; lower traces finer.
    pub threshold: f32,
    /// Shapes smaller than this many pixels are dropped.
    pub path_omit: u32,
    pub segment_length: f32,
    pub blur_radius: u32,
    /// Pixels differing from the blurred value by more than this keep their colour.
    pub blur_delta: u32,
    /// Significant bits per colour channel.
    pub color_precision: u8,
    pub path_precision: u8,
    pub corner_threshold: u32,
}

impl From<VectorizeSettings> for TraceParams {
    fn from(settings: VectorizeSettings) -> Self {
        let threshold = (1.1 - settings.detail as f32 * 0.1).clamp(0.1, 1.0);
        let color_precision = (settings.colors as f32).log2().ceil().clamp(1.0, 8.0) as u8;
        let path_precision = (9.0 - 8.0 * threshold).round().clamp(1.0, 8.0) as u8;

        Self {
            threshold,
            path_omit: 2 + (settings.smoothing as f32 * 2.0).round() as u32,
            segment_length: 3.5 + settings.smoothing as f32 * 0.65,
            blur_radius: settings.blur.min(5),
            blur_delta: 20 + 10 * settings.blur,
            color_precision,
            path_precision,
            corner_threshold: (threshold * 90.0).round() as u32,
        }
    }
}

impl TraceParams {
    /// `vtracer` arguments for `mode` (`spline` or `polygon`).
    pub fn vtracer_args(&self, mode: &str) -> Vec<String> {
        vec![
            "--input".to_string(),
            "{input}".to_string(),
            "--output".to_string(),
            "{output}".to_string(),
            "--colormode".to_string(),
            "color".to_string(),
            "--mode".to_string(),
            mode.to_string(),
            "--filter_speckle".to_string(),
            self.path_omit.to_string(),
            "--color_precision".to_string(),
            self.color_precision.to_string(),
            "--corner_threshold".to_string(),
            self.corner_threshold.to_string(),
            "--segment_length".to_string(),
            format!("{:.2}", self.segment_length),
            "--path_precision".to_string(),
            self.path_precision.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audio_quality_index() {
        assert_eq!(audio_quality_index(Some(256)), 8);
        assert_eq!(audio_quality_index(Some(16)), 1);
        assert_eq!(audio_quality_index(Some(1000)), 9);
        assert_eq!(audio_quality_index(Some(48)), 2);
        assert_eq!(audio_quality_index(None), 2);
        assert_eq!(audio_quality_index(Some(0)), 2);
    }

    #[test]
    fn test_quality_clamping() {
        assert_eq!(normalize_quality(Some(0)), 0.01);
        assert_eq!(normalize_quality(Some(150)), 1.0);
        assert_eq!(normalize_quality(Some(50)), 0.5);
        assert_eq!(normalize_quality(None), DEFAULT_IMAGE_QUALITY);
    }

    #[test]
    fn test_smart_compression_only_for_jpeg() {
        let jpg = image_quality(Some(92), true, "jpg");
        assert!((jpg - 0.82).abs() < 1e-5);
        assert_eq!(image_quality(Some(92), true, "webp"), 0.92);
        assert_eq!(image_quality(Some(92), false, "jpg"), 0.92);
    }

    #[test]
    fn test_smart_compression_floor() {
        assert_eq!(image_quality(Some(65), true, "jpg"), SMART_COMPRESSION_FLOOR);
        assert_eq!(image_quality(Some(10), true, "jpg"), SMART_COMPRESSION_FLOOR);
    }

    #[test]
    fn test_settings_from_metadata() {
        let meta = json!({"colors": 8, "detail": 9});
        let settings = VectorizeSettings::from_metadata(Some(&meta));
        assert_eq!(settings.colors, 8);
        assert_eq!(settings.detail, 9);
        assert_eq!(settings.smoothing, 3);

        let nested = json!({"vectorize": {"blur": 4}});
        assert_eq!(VectorizeSettings::from_metadata(Some(&nested)).blur, 4);
    }

    #[test]
    fn test_settings_clamped_and_defaulted() {
        let meta = json!({"colors": 500, "detail": 0, "smoothing": 99});
        let settings = VectorizeSettings::from_metadata(Some(&meta));
        assert_eq!(settings.colors, 64);
        assert_eq!(settings.detail, 1);
        assert_eq!(settings.smoothing, 10);

        let bad = json!({"colors": "lots"});
        assert_eq!(
            VectorizeSettings::from_metadata(Some(&bad)),
            VectorizeSettings::default()
        );
        assert_eq!(
            VectorizeSettings::from_metadata(None),
            VectorizeSettings::default()
        );
    }

    #[test]
    fn test_detail_lowers_threshold() {
        let coarse = TraceParams::from(VectorizeSettings {
            detail: 2,
            ..Default::default()
        });
        let fine = TraceParams::from(VectorizeSettings {
            detail: 9,
            ..Default::default()
        });
        assert!(fine.threshold < coarse.threshold);
        assert!(fine.path_precision >= coarse.path_precision);
        assert!(fine.corner_threshold < coarse.corner_threshold);
        let threshold = |detail| {
            TraceParams::from(VectorizeSettings {
                detail,
                ..Default::default()
            })
            .threshold
        };
        assert!((threshold(10) - 0.1).abs() < 1e-6);
        assert!((threshold(1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_smoothing_simplifies_paths() {
        let rough = TraceParams::from(VectorizeSettings {
            smoothing: 0,
            ..Default::default()
        });
        let smooth = TraceParams::from(VectorizeSettings {
            smoothing: 10,
            ..Default::default()
        });
        assert_eq!(rough.path_omit, 2);
        assert_eq!(smooth.path_omit, 22);
        assert!(smooth.segment_length > rough.segment_length);
        assert!((smooth.segment_length - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_colors_independent_of_detail() {
        let few = TraceParams::from(VectorizeSettings {
            colors: 4,
            ..Default::default()
        });
        let many = TraceParams::from(VectorizeSettings {
            colors: 64,
            ..Default::default()
        });
        assert_eq!(few.threshold, many.threshold);
        assert_eq!(few.color_precision, 2);
        assert_eq!(many.color_precision, 6);
    }

    #[test]
    fn test_blur_parameters() {
        let params = TraceParams::from(VectorizeSettings {
            blur: 8,
            ..Default::default()
        });
        assert_eq!(params.blur_radius, 5);
        assert_eq!(params.blur_delta, 100);
    }

    #[test]
    fn test_vtracer_args_mode() {
        let args = TraceParams::from(VectorizeSettings::default()).vtracer_args("polygon");
        let mode = args.iter().position(|a| a == "--mode").unwrap();
        assert_eq!(args[mode + 1], "polygon");
        assert!(args.contains(&"{input}".to_string()));
    }
}
