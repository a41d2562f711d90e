//! Document routes.

use super::tuning::image_quality;
use super::{RasterFormat, Route, StrategyVariant, Target, ToolInvocation};
use crate::job::ConversionOptions;

/// Where extracted text ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSink {
    Plain,
    Docx,
    Pdf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentRecipe {
    /// A tool writes the text of a PDF to `{output}`.
    ExtractPdfText { tool: ToolInvocation, sink: TextSink },
    /// A tool renders the first page to PNG at `{output}`.
    RenderFirstPage {
        tool: ToolInvocation,
        format: RasterFormat,
        quality: f32,
    },
    /// An office suite writes the target into `{outdir}`.
    OfficeConvert { tool: ToolInvocation },
    /// Read paragraphs from `word/document.xml`.
    DocxText { sink: TextSink },
    /// Treat the input as UTF-8 text.
    PlainText { sink: TextSink },
}

pub(super) const ROUTES: &[Route] = &[
    Route {
        source: "pdf",
        targets: &[
            Target { format: "docx", build: pdf_to_docx },
            Target { format: "txt", build: pdf_to_txt },
            Target { format: "png", build: pdf_to_png },
            Target { format: "jpg", build: pdf_to_jpg },
        ],
    },
    Route {
        source: "docx",
        targets: &[
            Target { format: "pdf", build: docx_to_pdf },
            Target { format: "txt", build: docx_to_txt },
        ],
    },
    Route {
        source: "txt",
        targets: &[Target { format: "pdf", build: txt_to_pdf }],
    },
];

/// 1.5x the 72 dpi PDF user space.
const RENDER_DPI: &str = "108";

pub(super) fn office(program: &str, convert_to: &str) -> ToolInvocation {
    ToolInvocation::new(
        program,
        &[
            "--headless",
            "--convert-to",
            convert_to,
            "--outdir",
            "{outdir}",
            "{input}",
        ],
    )
}

fn pdf_text(sink: TextSink) -> Vec<StrategyVariant> {
    vec![
        StrategyVariant::new(
            "pdftotext-layout",
            DocumentRecipe::ExtractPdfText {
                tool: ToolInvocation::new(
                    "pdftotext",
                    &["-layout", "-enc", "UTF-8", "{input}", "{output}"],
                ),
                sink,
            },
        ),
        StrategyVariant::new(
            "pdftotext-raw",
            DocumentRecipe::ExtractPdfText {
                tool: ToolInvocation::new(
                    "pdftotext",
                    &["-raw", "-enc", "UTF-8", "{input}", "{output}"],
                ),
                sink,
            },
        ),
        StrategyVariant::new(
            "mutool-text",
            DocumentRecipe::ExtractPdfText {
                tool: ToolInvocation::new(
                    "mutool",
                    &["draw", "-F", "txt", "-o", "{output}", "{input}"],
                ),
                sink,
            },
        ),
    ]
}

fn pdf_to_docx(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    pdf_text(TextSink::Docx)
}

fn pdf_to_txt(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    pdf_text(TextSink::Plain)
}

fn pdf_page(format: RasterFormat, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let quality = image_quality(options.quality, options.smart_compression, format.extension());
    vec![
        StrategyVariant::new(
            "pdftoppm",
            DocumentRecipe::RenderFirstPage {
                tool: ToolInvocation::new(
                    "pdftoppm",
                    &[
                        "-f",
                        "1",
                        "-l",
                        "1",
                        "-r",
                        RENDER_DPI,
                        "-png",
                        "-singlefile",
                        "{input}",
                        "{output_stem}",
                    ],
                ),
                format,
                quality,
            },
        ),
        StrategyVariant::new(
            "mutool-draw",
            DocumentRecipe::RenderFirstPage {
                tool: ToolInvocation::new(
                    "mutool",
                    &["draw", "-F", "png", "-r", RENDER_DPI, "-o", "{output}", "{input}", "1"],
                ),
                format,
                quality,
            },
        ),
    ]
}

fn pdf_to_png(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    pdf_page(RasterFormat::Png, options)
}

fn pdf_to_jpg(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    pdf_page(RasterFormat::Jpeg, options)
}

fn docx_to_pdf(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![
        StrategyVariant::new(
            "libreoffice",
            DocumentRecipe::OfficeConvert {
                tool: office("libreoffice", "pdf"),
            },
        ),
        StrategyVariant::new(
            "soffice",
            DocumentRecipe::OfficeConvert {
                tool: office("soffice", "pdf"),
            },
        ),
        StrategyVariant::new(
            "docx-text-pdf",
            DocumentRecipe::DocxText {
                sink: TextSink::Pdf,
            },
        ),
    ]
}

fn docx_to_txt(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![
        StrategyVariant::new(
            "docx-text",
            DocumentRecipe::DocxText {
                sink: TextSink::Plain,
            },
        ),
        StrategyVariant::new(
            "libreoffice",
            DocumentRecipe::OfficeConvert {
                tool: office("libreoffice", "txt:Text"),
            },
        ),
    ]
}

fn txt_to_pdf(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![
        StrategyVariant::new(
            "libreoffice",
            DocumentRecipe::OfficeConvert {
                tool: office("libreoffice", "pdf"),
            },
        ),
        StrategyVariant::new(
            "soffice",
            DocumentRecipe::OfficeConvert {
                tool: office("soffice", "pdf"),
            },
        ),
        StrategyVariant::new(
            "text-pdf",
            DocumentRecipe::PlainText {
                sink: TextSink::Pdf,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Recipe;

    #[test]
    fn test_pdf_text_variant_order() {
        let labels: Vec<_> = pdf_to_txt("pdf", &ConversionOptions::new("txt"))
            .into_iter()
            .map(|v| v.label)
            .collect();
        assert_eq!(labels, vec!["pdftotext-layout", "pdftotext-raw", "mutool-text"]);
    }

    #[test]
    fn test_office_writes_to_outdir() {
        let tool = office("libreoffice", "pdf");
        assert!(tool.args.contains(&"{outdir}".to_string()));
        assert_eq!(tool.args.last().map(String::as_str), Some("{input}"));
    }

    #[test]
    fn test_txt_to_pdf_ends_with_native_writer() {
        let variants = txt_to_pdf("txt", &ConversionOptions::new("pdf"));
        assert!(matches!(
            variants.last().map(|v| &v.recipe),
            Some(Recipe::Document(DocumentRecipe::PlainText {
                sink: TextSink::Pdf
            }))
        ));
    }
}
