//! Raster and vector image conversions.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::process::{tool_name, ProcessRunner};
use super::staging::Staging;
use super::traits::CategoryConverter;
use crate::job::{Artifact, ConversionOptions, ConverterOutput, Job};
use crate::strategy::{
    ImageRecipe, RasterFormat, Recipe, StrategyVariant, ToolInvocation, TraceParams,
};

/// Image conversions: native codecs plus external rasterizers and tracers.
pub struct ImageConverter {
    config: ConverterConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl ImageConverter {
    pub fn new(config: ConverterConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    async fn run_tool(
        &self,
        tool: &ToolInvocation,
        input: &Path,
        output: &Path,
        staging: &Staging,
    ) -> Result<Vec<u8>, ConverterError> {
        let program = self.config.tool_path(&tool.program);
        let args = tool.render(input, output, &staging.outdir());
        self.runner
            .run(&program, &args, self.config.timeout())
            .await?;
        let bytes = tokio::fs::read(output).await.map_err(|_| {
            ConverterError::tool_failed(tool_name(&program), "output file not created", None)
        })?;
        if bytes.is_empty() {
            return Err(ConverterError::tool_failed(
                tool_name(&program),
                "output file is empty",
                None,
            ));
        }
        Ok(bytes)
    }
}

/// Decode, resize and encode natively. Returns bytes and final dimensions.
pub(crate) fn encode_raster(
    bytes: &[u8],
    options: &ConversionOptions,
    format: RasterFormat,
    quality: f32,
    flatten_alpha: bool,
) -> Result<(Vec<u8>, u32, u32), ConverterError> {
    let img = decode(bytes)?;
    let img = resize(img, options);
    let (width, height) = img.dimensions();
    let img = if flatten_alpha {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(flatten_onto_white(&img)).to_rgb8())
    } else {
        img
    };
    Ok((encode(&img, format, quality)?, width, height))
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ConverterError> {
    image::load_from_memory(bytes).map_err(|e| ConverterError::decode(e.to_string()))
}

fn resize(img: DynamicImage, options: &ConversionOptions) -> DynamicImage {
    let width = options.width.filter(|w| *w > 0);
    let height = options.height.filter(|h| *h > 0);
    if width.is_none() && height.is_none() {
        return img;
    }
    let (current_w, current_h) = img.dimensions();
    if options.maintain_aspect_ratio {
        img.resize(
            width.unwrap_or(u32::MAX),
            height.unwrap_or(u32::MAX),
            FilterType::Lanczos3,
        )
    } else {
        img.resize_exact(
            width.unwrap_or(current_w),
            height.unwrap_or(current_h),
            FilterType::Lanczos3,
        )
    }
}

fn flatten_onto_white(img: &DynamicImage) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    canvas
}

fn encode(
    img: &DynamicImage,
    format: RasterFormat,
    quality: f32,
) -> Result<Vec<u8>, ConverterError> {
    let mut buf = Vec::new();
    let result = match format {
        RasterFormat::Png => img.write_with_encoder(PngEncoder::new(&mut buf)),
        RasterFormat::Jpeg => {
            let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        }
        RasterFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
    };
    result.map_err(|e| ConverterError::encode(format!("{}: {}", format.extension(), e)))?;
    Ok(buf)
}

/// Smooth flat areas while keeping pixels that differ from their blurred
/// value by more than `delta` (summed over channels).
fn selective_blur(img: &RgbaImage, radius: u32, delta: u32) -> RgbaImage {
    if radius == 0 {
        return img.clone();
    }
    let mut blurred = image::imageops::blur(img, radius as f32);
    for (x, y, pixel) in blurred.enumerate_pixels_mut() {
        let original = img.get_pixel(x, y);
        let diff: u32 = pixel
            .0
            .iter()
            .zip(original.0.iter())
            .map(|(a, b)| (i32::from(*a) - i32::from(*b)).unsigned_abs())
            .sum();
        if diff > delta {
            *pixel = *original;
        }
    }
    blurred
}

/// Decode, resize and blur the source, then write it as PNG for the tracer.
fn prepare_trace_input(
    bytes: &[u8],
    options: &ConversionOptions,
    params: &TraceParams,
) -> Result<(Vec<u8>, u32, u32), ConverterError> {
    let img = resize(decode(bytes)?, options);
    let (width, height) = img.dimensions();
    let rgba = selective_blur(&img.to_rgba8(), params.blur_radius, params.blur_delta);
    let png = encode(&DynamicImage::ImageRgba8(rgba), RasterFormat::Png, 1.0)?;
    Ok((png, width, height))
}

pub(crate) fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Quality the native encoder applies, `None` where it writes losslessly.
fn native_quality(format: RasterFormat, quality: f32) -> Option<f32> {
    match format {
        RasterFormat::Jpeg => Some(quality),
        RasterFormat::Png | RasterFormat::WebP => None,
    }
}

pub(crate) fn quality_details(
    width: u32,
    height: u32,
    format: RasterFormat,
    quality: Option<f32>,
) -> String {
    match (format, quality) {
        (RasterFormat::Png, _) => format!("{}x{}", width, height),
        (_, Some(quality)) => format!(
            "{}x{} · Quality {}%",
            width,
            height,
            (quality * 100.0).round() as u32
        ),
        (_, None) => format!("{}x{} · Lossless", width, height),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ConverterError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ConverterError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConverterError::encode(format!("image worker failed: {}", e)))?
}

#[async_trait]
impl CategoryConverter for ImageConverter {
    fn name(&self) -> &str {
        "image"
    }

    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError> {
        let recipe = match &variant.recipe {
            Recipe::Image(recipe) => recipe,
            other => return Err(ConverterError::unsupported_recipe(self.name(), other.family())),
        };
        let options = job.options.clone();

        match recipe {
            ImageRecipe::Encode {
                format,
                quality,
                flatten_alpha,
            } => {
                let (format, quality, flatten) = (*format, *quality, *flatten_alpha);
                let bytes = job.source.bytes.clone();
                let (encoded, width, height) =
                    blocking(move || encode_raster(&bytes, &options, format, quality, flatten))
                        .await?;
                let shown = native_quality(format, quality);
                Ok(raster_output(encoded, width, height, format, shown))
            }
            ImageRecipe::EncodeWithTool { tool } => {
                let bytes = job.source.bytes.clone();
                let (prepared, _, _) = blocking(move || {
                    encode_raster(&bytes, &options, RasterFormat::Png, 1.0, false)
                })
                .await?;
                let input = staging.path("prepared.png");
                tokio::fs::write(&input, &prepared).await?;

                let format = RasterFormat::from_format(&job.target_format).ok_or_else(|| {
                    ConverterError::invalid_input(format!(
                        "{} is not a raster target",
                        job.target_format
                    ))
                })?;
                let encoded = self
                    .run_tool(tool, &input, &staging.output(format.extension()), staging)
                    .await?;
                let (width, height) = image::load_from_memory(&encoded)
                    .map(|img| img.dimensions())
                    .unwrap_or((0, 0));
                let quality = crate::strategy::image_quality(
                    job.options.quality,
                    job.options.smart_compression,
                    format.extension(),
                );
                Ok(raster_output(encoded, width, height, format, Some(quality)))
            }
            ImageRecipe::Rasterize {
                tool,
                format,
                quality,
            } => {
                let raster = self
                    .run_tool(tool, staging.input(), &staging.path("raster.png"), staging)
                    .await?;
                let (format, quality) = (*format, *quality);
                let (encoded, width, height) = blocking(move || {
                    encode_raster(&raster, &options, format, quality, format == RasterFormat::Jpeg)
                })
                .await?;
                let shown = native_quality(format, quality);
                Ok(raster_output(encoded, width, height, format, shown))
            }
            ImageRecipe::Trace { tool, params } => {
                let bytes = job.source.bytes.clone();
                let trace_params = *params;
                let (prepared, width, height) =
                    blocking(move || prepare_trace_input(&bytes, &options, &trace_params)).await?;
                let input = staging.path("trace-input.png");
                tokio::fs::write(&input, &prepared).await?;

                let svg = self
                    .run_tool(tool, &input, &staging.output("svg"), staging)
                    .await?;
                if !String::from_utf8_lossy(&svg).contains("<svg") {
                    return Err(ConverterError::tool_failed(
                        tool.program.clone(),
                        "output is not SVG",
                        None,
                    ));
                }
                debug!(job_id = %job.id, size = svg.len(), "Traced SVG");
                Ok(ConverterOutput::new(Artifact::new(svg, "image/svg+xml"))
                    .with_details(format!("{}x{} · Vectorized", width, height)))
            }
        }
    }
}

fn raster_output(
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    format: RasterFormat,
    quality: Option<f32>,
) -> ConverterOutput {
    let preview = data_url(format.mime(), &bytes);
    ConverterOutput::new(Artifact::new(bytes, format.mime()))
        .with_details(quality_details(width, height, format, quality))
        .with_preview_url(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn png_fixture(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, alpha]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_png_to_jpeg_flattened() {
        let png = png_fixture(8, 4, 128);
        let (jpeg, w, h) =
            encode_raster(&png, &ConversionOptions::new("jpg"), RasterFormat::Jpeg, 0.9, true)
                .unwrap();
        assert_eq!((w, h), (8, 4));
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_resize_keeps_aspect_ratio() {
        let png = png_fixture(100, 50, 255);
        let options = ConversionOptions::new("png").with_size(Some(40), None);
        let (_, w, h) = encode_raster(&png, &options, RasterFormat::Png, 1.0, false).unwrap();
        assert_eq!((w, h), (40, 20));
    }

    #[test]
    fn test_resize_exact_without_aspect() {
        let png = png_fixture(100, 50, 255);
        let mut options = ConversionOptions::new("png").with_size(Some(30), Some(30));
        options.maintain_aspect_ratio = false;
        let (_, w, h) = encode_raster(&png, &options, RasterFormat::Png, 1.0, false).unwrap();
        assert_eq!((w, h), (30, 30));
    }

    #[test]
    fn test_webp_lossless_encode() {
        let png = png_fixture(4, 4, 255);
        let (webp, _, _) =
            encode_raster(&png, &ConversionOptions::new("webp"), RasterFormat::WebP, 0.9, false)
                .unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = encode_raster(
            b"not an image",
            &ConversionOptions::new("png"),
            RasterFormat::Png,
            1.0,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConverterError::Decode { .. }));
    }

    #[test]
    fn test_selective_blur_keeps_edges() {
        let mut img = RgbaImage::from_pixel(9, 9, Rgba([0, 0, 0, 255]));
        img.put_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let kept = selective_blur(&img, 2, 20);
        assert_eq!(*kept.get_pixel(4, 4), Rgba([255, 255, 255, 255]));
        assert_eq!(selective_blur(&img, 0, 20), img);
    }

    #[test]
    fn test_quality_details() {
        assert_eq!(
            quality_details(640, 480, RasterFormat::Jpeg, Some(0.82)),
            "640x480 · Quality 82%"
        );
        assert_eq!(quality_details(10, 10, RasterFormat::Png, Some(1.0)), "10x10");
        assert_eq!(
            quality_details(640, 480, RasterFormat::WebP, Some(0.4)),
            "640x480 · Quality 40%"
        );
    }

    #[test]
    fn test_native_webp_reports_lossless() {
        let shown = native_quality(RasterFormat::WebP, 0.05);
        assert_eq!(shown, None);
        let details = quality_details(4, 4, RasterFormat::WebP, shown);
        assert_eq!(details, "4x4 · Lossless");
        assert!(!details.contains("Quality"));

        let shown = native_quality(RasterFormat::Jpeg, 0.05);
        assert_eq!(quality_details(4, 4, RasterFormat::Jpeg, shown), "4x4 · Quality 5%");
    }

    #[test]
    fn test_native_webp_ignores_quality() {
        // The lossless encoder has no quality knob, so low and high settings
        // produce the same bytes.
        let png = png_fixture(6, 6, 255);
        let options = ConversionOptions::new("webp");
        let (low, _, _) = encode_raster(&png, &options, RasterFormat::WebP, 0.05, false).unwrap();
        let (high, _, _) = encode_raster(&png, &options, RasterFormat::WebP, 0.95, false).unwrap();
        assert_eq!(low, high);
    }

    #[test]
    fn test_data_url_prefix() {
        assert!(data_url("image/png", b"abc").starts_with("data:image/png;base64,YWJj"));
    }
}
