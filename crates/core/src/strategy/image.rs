//! Image routes.

use super::tuning::{image_quality, TraceParams, VectorizeSettings};
use super::{RasterFormat, Route, StrategyVariant, Target, ToolInvocation};
use crate::job::ConversionOptions;

#[derive(Debug, Clone, PartialEq)]
pub enum ImageRecipe {
    /// Decode and encode in process.
    Encode {
        format: RasterFormat,
        quality: f32,
        /// Composite onto white before encoding.
        flatten_alpha: bool,
    },
    /// Decode in process, then let an external encoder write the target.
    EncodeWithTool { tool: ToolInvocation },
    /// Rasterize vector input with a tool, then encode in process.
    Rasterize {
        tool: ToolInvocation,
        format: RasterFormat,
        quality: f32,
    },
    /// Trace a raster into SVG.
    Trace {
        tool: ToolInvocation,
        params: TraceParams,
    },
}

pub(super) const ROUTES: &[Route] = &[
    Route {
        source: "png",
        targets: &[
            Target { format: "jpg", build: to_jpg },
            Target { format: "webp", build: to_webp },
            Target { format: "svg", build: to_svg },
        ],
    },
    Route {
        source: "jpg",
        targets: &[
            Target { format: "png", build: to_png },
            Target { format: "webp", build: to_webp },
            Target { format: "svg", build: to_svg },
        ],
    },
    Route {
        source: "webp",
        targets: &[
            Target { format: "png", build: to_png },
            Target { format: "jpg", build: to_jpg },
            Target { format: "svg", build: to_svg },
        ],
    },
    Route {
        source: "gif",
        targets: &[
            Target { format: "png", build: to_png },
            Target { format: "jpg", build: to_jpg },
            Target { format: "webp", build: to_webp },
        ],
    },
    Route {
        source: "bmp",
        targets: &[
            Target { format: "png", build: to_png },
            Target { format: "jpg", build: to_jpg },
            Target { format: "webp", build: to_webp },
            Target { format: "svg", build: to_svg },
        ],
    },
    Route {
        source: "svg",
        targets: &[
            Target { format: "png", build: to_png },
            Target { format: "jpg", build: to_jpg },
            Target { format: "webp", build: to_webp },
        ],
    },
];

/// SVG input is rasterized by a tool; the rest decode natively.
fn raster_variants(
    source: &str,
    format: RasterFormat,
    options: &ConversionOptions,
) -> Vec<StrategyVariant> {
    if source != "svg" {
        return Vec::new();
    }
    let quality = image_quality(options.quality, options.smart_compression, format.extension());

    let mut rsvg = ToolInvocation::new("rsvg-convert", &["-f", "png"]);
    if let Some(width) = options.width.filter(|w| *w > 0) {
        rsvg = rsvg.arg("-w").arg(width.to_string());
    }
    if let Some(height) = options.height.filter(|h| *h > 0) {
        rsvg = rsvg.arg("-h").arg(height.to_string());
    }
    if options.width.is_some() && options.height.is_some() && options.maintain_aspect_ratio {
        rsvg = rsvg.arg("--keep-aspect-ratio");
    }
    let rsvg = rsvg.arg("-o").arg("{output}").arg("{input}");

    vec![
        StrategyVariant::new(
            "rsvg-convert",
            ImageRecipe::Rasterize {
                tool: rsvg,
                format,
                quality,
            },
        ),
        StrategyVariant::new(
            "magick",
            ImageRecipe::Rasterize {
                tool: ToolInvocation::new(
                    "magick",
                    &["-background", "none", "{input}", "{output}"],
                ),
                format,
                quality,
            },
        ),
    ]
}

fn to_png(source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let rasterized = raster_variants(source, RasterFormat::Png, options);
    if !rasterized.is_empty() {
        return rasterized;
    }
    vec![StrategyVariant::new(
        "png",
        ImageRecipe::Encode {
            format: RasterFormat::Png,
            quality: 1.0,
            flatten_alpha: false,
        },
    )]
}

fn to_jpg(source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let rasterized = raster_variants(source, RasterFormat::Jpeg, options);
    if !rasterized.is_empty() {
        return rasterized;
    }
    let quality = image_quality(options.quality, options.smart_compression, "jpg");
    vec![
        StrategyVariant::new(
            "jpeg",
            ImageRecipe::Encode {
                format: RasterFormat::Jpeg,
                quality,
                flatten_alpha: false,
            },
        ),
        StrategyVariant::new(
            "jpeg-flatten",
            ImageRecipe::Encode {
                format: RasterFormat::Jpeg,
                quality,
                flatten_alpha: true,
            },
        ),
    ]
}

fn to_webp(source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let rasterized = raster_variants(source, RasterFormat::WebP, options);
    if !rasterized.is_empty() {
        return rasterized;
    }
    let quality = image_quality(options.quality, options.smart_compression, "webp");
    let percent = (quality * 100.0).round() as u32;
    vec![
        StrategyVariant::new(
            "cwebp",
            ImageRecipe::EncodeWithTool {
                tool: ToolInvocation::new("cwebp", &["-quiet", "-q"])
                    .arg(percent.to_string())
                    .arg("{input}")
                    .arg("-o")
                    .arg("{output}"),
            },
        ),
        StrategyVariant::new(
            "webp-lossless",
            ImageRecipe::Encode {
                format: RasterFormat::WebP,
                quality: 1.0,
                flatten_alpha: false,
            },
        ),
    ]
}

fn to_svg(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let params = TraceParams::from(VectorizeSettings::from_metadata(options.metadata.as_ref()));
    ["spline", "polygon"]
        .into_iter()
        .map(|mode| {
            let args = params.vtracer_args(mode);
            StrategyVariant::new(
                format!("vtracer-{}", mode),
                ImageRecipe::Trace {
                    tool: ToolInvocation {
                        program: "vtracer".to_string(),
                        args,
                    },
                    params,
                },
            )
        })
        .collect()
}
