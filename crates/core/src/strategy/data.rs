//! Structured data and markup routes, converted in process.

use super::document::office;
use super::{Route, StrategyVariant, Target, ToolInvocation};
use crate::job::ConversionOptions;

/// Parser used to read the input into a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataReader {
    /// `flexible` tolerates ragged rows.
    Csv { flexible: bool },
    Json,
    Yaml,
    Xml,
    Xlsx,
}

/// Serializer for the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWriter {
    Csv,
    Json,
    Yaml,
    Xml,
    Xlsx,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataRecipe {
    Reshape { reader: DataReader, writer: DataWriter },
    MarkdownToHtml,
    HtmlToMarkdown,
    /// Render Markdown to HTML and let an office suite print it.
    MarkdownToPdf { tool: ToolInvocation },
    /// Lay out the Markdown source as plain text pages.
    MarkdownTextPdf,
}

pub(super) const DATA_ROUTES: &[Route] = &[
    Route {
        source: "csv",
        targets: &[
            Target { format: "json", build: csv_to_json },
            Target { format: "xlsx", build: csv_to_xlsx },
            Target { format: "xml", build: csv_to_xml },
        ],
    },
    Route {
        source: "json",
        targets: &[
            Target { format: "csv", build: json_to_csv },
            Target { format: "xlsx", build: json_to_xlsx },
            Target { format: "xml", build: json_to_xml },
            Target { format: "yaml", build: json_to_yaml },
        ],
    },
    Route {
        source: "xlsx",
        targets: &[
            Target { format: "csv", build: xlsx_to_csv },
            Target { format: "json", build: xlsx_to_json },
        ],
    },
    Route {
        source: "xml",
        targets: &[
            Target { format: "json", build: xml_to_json },
            Target { format: "csv", build: xml_to_csv },
        ],
    },
];

pub(super) const CODE_ROUTES: &[Route] = &[
    Route {
        source: "json",
        targets: &[Target { format: "yaml", build: json_to_yaml }],
    },
    Route {
        source: "yaml",
        targets: &[Target { format: "json", build: yaml_to_json }],
    },
    Route {
        source: "html",
        targets: &[Target { format: "md", build: html_to_md }],
    },
    Route {
        source: "md",
        targets: &[
            Target { format: "html", build: md_to_html },
            Target { format: "pdf", build: md_to_pdf },
        ],
    },
];

fn reshape(reader: DataReader, writer: DataWriter) -> StrategyVariant {
    let label = match reader {
        DataReader::Csv { flexible: true } => "csv-lenient",
        DataReader::Csv { flexible: false } => "csv-strict",
        DataReader::Json => "json",
        DataReader::Yaml => "yaml",
        DataReader::Xml => "xml",
        DataReader::Xlsx => "xlsx",
    };
    StrategyVariant::new(label, DataRecipe::Reshape { reader, writer })
}

/// Strict parse first, then one that accepts ragged rows.
fn from_csv(writer: DataWriter) -> Vec<StrategyVariant> {
    vec![
        reshape(DataReader::Csv { flexible: false }, writer),
        reshape(DataReader::Csv { flexible: true }, writer),
    ]
}

fn csv_to_json(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    from_csv(DataWriter::Json)
}

fn csv_to_xlsx(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    from_csv(DataWriter::Xlsx)
}

fn csv_to_xml(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    from_csv(DataWriter::Xml)
}

fn json_to_csv(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Json, DataWriter::Csv)]
}

fn json_to_xlsx(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Json, DataWriter::Xlsx)]
}

fn json_to_xml(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Json, DataWriter::Xml)]
}

fn json_to_yaml(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Json, DataWriter::Yaml)]
}

fn yaml_to_json(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Yaml, DataWriter::Json)]
}

fn xlsx_to_csv(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Xlsx, DataWriter::Csv)]
}

fn xlsx_to_json(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Xlsx, DataWriter::Json)]
}

fn xml_to_json(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Xml, DataWriter::Json)]
}

fn xml_to_csv(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![reshape(DataReader::Xml, DataWriter::Csv)]
}

fn html_to_md(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![StrategyVariant::new("html2md", DataRecipe::HtmlToMarkdown)]
}

fn md_to_html(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![StrategyVariant::new("commonmark", DataRecipe::MarkdownToHtml)]
}

fn md_to_pdf(_: &str, _: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![
        StrategyVariant::new(
            "html-libreoffice",
            DataRecipe::MarkdownToPdf {
                tool: office("libreoffice", "pdf"),
            },
        ),
        StrategyVariant::new(
            "html-soffice",
            DataRecipe::MarkdownToPdf {
                tool: office("soffice", "pdf"),
            },
        ),
        StrategyVariant::new("text-pdf", DataRecipe::MarkdownTextPdf),
    ]
}
