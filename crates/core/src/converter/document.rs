//! Document conversions: PDF text and pages, DOCX, plain text.

use async_trait::async_trait;
use image::GenericImageView;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::image::{data_url, encode_raster};
use super::process::{tool_name, ProcessRunner};
use super::staging::Staging;
use super::text::{build_docx, docx_text, text_to_pdf};
use super::traits::CategoryConverter;
use crate::classifier::mime_for;
use crate::job::{Artifact, ConverterOutput, Job};
use crate::strategy::{
    DocumentRecipe, RasterFormat, Recipe, StrategyVariant, TextSink, ToolInvocation,
};

pub struct DocumentConverter {
    config: ConverterConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl DocumentConverter {
    pub fn new(config: ConverterConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    async fn run_tool(
        &self,
        tool: &ToolInvocation,
        input: &Path,
        output: &Path,
        staging: &Staging,
    ) -> Result<PathBuf, ConverterError> {
        let program = self.config.tool_path(&tool.program);
        let args = tool.render(input, output, &staging.outdir());
        self.runner
            .run(&program, &args, self.config.timeout())
            .await?;
        Ok(program)
    }
}

/// Wrap extracted text into the requested container.
pub(crate) fn sink_text(text: &str, sink: TextSink) -> Result<ConverterOutput, ConverterError> {
    let details = format!("{} characters", text.chars().count());
    let artifact = match sink {
        TextSink::Plain => Artifact::new(text.as_bytes().to_vec(), mime_for("txt")),
        TextSink::Docx => Artifact::new(build_docx(text)?, mime_for("docx")),
        TextSink::Pdf => Artifact::new(text_to_pdf(text), mime_for("pdf")),
    };
    Ok(ConverterOutput::new(artifact).with_details(details))
}

/// Find the file an office suite wrote for `extension` in `outdir`.
pub(crate) async fn find_output(outdir: &Path, extension: &str) -> Option<PathBuf> {
    let mut entries = tokio::fs::read_dir(outdir).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let matches = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            return Some(path);
        }
    }
    None
}

#[async_trait]
impl CategoryConverter for DocumentConverter {
    fn name(&self) -> &str {
        "document"
    }

    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError> {
        let recipe = match &variant.recipe {
            Recipe::Document(recipe) => recipe,
            other => return Err(ConverterError::unsupported_recipe(self.name(), other.family())),
        };

        match recipe {
            DocumentRecipe::ExtractPdfText { tool, sink } => {
                let output = staging.path("extracted.txt");
                let program = self
                    .run_tool(tool, staging.input(), &output, staging)
                    .await?;
                let bytes = tokio::fs::read(&output).await.map_err(|_| {
                    ConverterError::tool_failed(tool_name(&program), "no text written", None)
                })?;
                let text = String::from_utf8_lossy(&bytes).replace('\u{c}', "\n");
                if text.trim().is_empty() {
                    return Err(ConverterError::invalid_input("PDF has no extractable text"));
                }
                sink_text(&text, *sink)
            }
            DocumentRecipe::RenderFirstPage {
                tool,
                format,
                quality,
            } => {
                let output = staging.output("png");
                let program = self
                    .run_tool(tool, staging.input(), &output, staging)
                    .await?;
                let page = tokio::fs::read(&output).await.map_err(|_| {
                    ConverterError::tool_failed(tool_name(&program), "page was not rendered", None)
                })?;

                let (format, quality) = (*format, *quality);
                let options = job.options.clone();
                let untouched = format == RasterFormat::Png
                    && options.width.is_none()
                    && options.height.is_none();
                let (bytes, width, height) = if untouched {
                    let dims = image::load_from_memory(&page)
                        .map_err(|e| ConverterError::decode(e.to_string()))?
                        .dimensions();
                    (page, dims.0, dims.1)
                } else {
                    tokio::task::spawn_blocking(move || {
                        encode_raster(&page, &options, format, quality, true)
                    })
                    .await
                    .map_err(|e| ConverterError::encode(e.to_string()))??
                };

                let preview = data_url(format.mime(), &bytes);
                Ok(ConverterOutput::new(Artifact::new(bytes, format.mime()))
                    .with_details(format!("Page 1 · {}x{}", width, height))
                    .with_preview_url(preview))
            }
            DocumentRecipe::OfficeConvert { tool } => {
                let program = self
                    .run_tool(tool, staging.input(), &staging.output(&job.target_format), staging)
                    .await?;
                let produced = find_output(&staging.outdir(), &job.target_format)
                    .await
                    .ok_or_else(|| {
                        ConverterError::tool_failed(
                            tool_name(&program),
                            format!("no .{} file produced", job.target_format),
                            None,
                        )
                    })?;
                let bytes = tokio::fs::read(&produced).await?;
                Ok(ConverterOutput::new(Artifact::new(
                    bytes,
                    mime_for(&job.target_format),
                )))
            }
            DocumentRecipe::DocxText { sink } => {
                let text = docx_text(&job.source.bytes)?;
                sink_text(&text, *sink)
            }
            DocumentRecipe::PlainText { sink } => {
                let text = String::from_utf8_lossy(&job.source.bytes);
                sink_text(&text, *sink)
            }
        }
    }
}
