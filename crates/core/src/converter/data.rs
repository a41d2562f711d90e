//! Structured data and markup conversions, all in process.

use async_trait::async_trait;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use super::config::ConverterConfig;
use super::document::find_output;
use super::error::ConverterError;
use super::process::{tool_name, ProcessRunner};
use super::staging::Staging;
use super::text::{escape_xml, strip_tags, text_to_pdf};
use super::traits::CategoryConverter;
use crate::classifier::mime_for;
use crate::job::{Artifact, ConverterOutput, Job};
use crate::strategy::{DataReader, DataRecipe, DataWriter, Recipe, StrategyVariant};

/// Converts tabular and tree-shaped data plus Markdown and HTML.
pub struct DataConverter {
    config: ConverterConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl DataConverter {
    pub fn new(config: ConverterConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, ConverterError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ConverterError::decode(format!("input is not UTF-8: {}", e)))?;
    Ok(text.trim_start_matches('\u{feff}'))
}

/// Parse the input into a JSON tree.
pub fn read(reader: DataReader, bytes: &[u8]) -> Result<Value, ConverterError> {
    match reader {
        DataReader::Csv { flexible } => read_csv(bytes, flexible),
        DataReader::Json => serde_json::from_str(utf8(bytes)?)
            .map_err(|e| ConverterError::decode(format!("json: {}", e))),
        DataReader::Yaml => serde_yaml::from_str(utf8(bytes)?)
            .map_err(|e| ConverterError::decode(format!("yaml: {}", e))),
        DataReader::Xml => read_xml(utf8(bytes)?),
        DataReader::Xlsx => read_xlsx(bytes),
    }
}

fn read_csv(bytes: &[u8], flexible: bool) -> Result<Value, ConverterError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(flexible)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ConverterError::decode(format!("csv: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ConverterError::decode(format!("csv: {}", e)))?;
        let mut row = Map::new();
        for (i, field) in record.iter().enumerate() {
            let key = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("field_{}", i + 1));
            row.insert(key, Value::String(field.to_string()));
        }
        for header in headers.iter().skip(record.len()) {
            row.insert(header.clone(), Value::String(String::new()));
        }
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

fn read_xml(text: &str) -> Result<Value, ConverterError> {
    let doc = roxmltree::Document::parse(text)
        .map_err(|e| ConverterError::decode(format!("xml: {}", e)))?;
    Ok(xml_node(doc.root_element()))
}

/// Leaf elements become their text; repeated siblings become arrays.
fn xml_node(node: roxmltree::Node) -> Value {
    let children: Vec<_> = node.children().filter(|c| c.is_element()).collect();
    if children.is_empty() {
        return Value::String(node.text().unwrap_or_default().trim().to_string());
    }
    let mut object = Map::new();
    for child in children {
        let name = child.tag_name().name().to_string();
        let value = xml_node(child);
        match object.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(name, value);
            }
        }
    }
    Value::Object(object)
}

fn read_xlsx(bytes: &[u8]) -> Result<Value, ConverterError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| ConverterError::decode(format!("xlsx: {}", e)))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConverterError::invalid_input("workbook has no sheets"))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ConverterError::decode(format!("xlsx: {}", e)))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string()).collect(),
        None => return Ok(Value::Array(Vec::new())),
    };

    let mut out = Vec::new();
    for row in rows {
        let mut object = Map::new();
        for (i, cell) in row.iter().enumerate() {
            let value = match cell {
                Data::Empty => continue,
                Data::Int(n) => Value::from(*n),
                Data::Float(f) => serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(f.to_string())),
                Data::Bool(b) => Value::Bool(*b),
                Data::String(s) => Value::String(s.clone()),
                other => Value::String(other.to_string()),
            };
            let key = headers
                .get(i)
                .filter(|h| !h.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("field_{}", i + 1));
            object.insert(key, value);
        }
        if !object.is_empty() {
            out.push(Value::Object(object));
        }
    }
    Ok(Value::Array(out))
}

/// Rows for tabular writers.
///
/// Arrays are used as-is, an object wrapping a single array of records is
/// unwrapped, any other object is one row and scalars become `{value: ..}`.
fn records(value: &Value) -> Vec<Map<String, Value>> {
    let as_row = |v: &Value| match v {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    };
    match value {
        Value::Array(items) => items.iter().map(as_row).collect(),
        Value::Object(map) if map.len() == 1 => match map.values().next() {
            Some(Value::Array(items)) if items.iter().all(Value::is_object) => {
                items.iter().map(as_row).collect()
            }
            _ => vec![map.clone()],
        },
        other => vec![as_row(other)],
    }
}

/// Union of keys across rows, in first-seen order.
fn columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Serialize a JSON tree.
pub fn write(writer: DataWriter, value: &Value) -> Result<Vec<u8>, ConverterError> {
    match writer {
        DataWriter::Json => serde_json::to_vec_pretty(value)
            .map_err(|e| ConverterError::encode(format!("json: {}", e))),
        DataWriter::Yaml => serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| ConverterError::encode(format!("yaml: {}", e))),
        DataWriter::Csv => write_csv(value),
        DataWriter::Xml => Ok(write_xml(value).into_bytes()),
        DataWriter::Xlsx => write_xlsx(value),
    }
}

fn write_csv(value: &Value) -> Result<Vec<u8>, ConverterError> {
    let rows = records(value);
    let columns = columns(&rows);
    let mut writer = csv::Writer::from_writer(Vec::new());
    let encode = |e: csv::Error| ConverterError::encode(format!("csv: {}", e));

    writer.write_record(&columns).map_err(encode)?;
    for row in &rows {
        let fields: Vec<String> = columns.iter().map(|c| cell_text(row.get(c))).collect();
        writer.write_record(&fields).map_err(encode)?;
    }
    writer
        .into_inner()
        .map_err(|e| ConverterError::encode(format!("csv: {}", e)))
}

/// Element name safe for XML; invalid characters become `_`.
fn xml_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn write_xml(value: &Value) -> String {
    fn element(out: &mut String, tag: &str, value: &Value, depth: usize) {
        let indent = "  ".repeat(depth);
        match value {
            Value::Array(items) => {
                for item in items {
                    element(out, tag, item, depth);
                }
            }
            Value::Object(map) => {
                out.push_str(&format!("{}<{}>\n", indent, tag));
                for (key, child) in map {
                    element(out, &xml_name(key), child, depth + 1);
                }
                out.push_str(&format!("{}</{}>\n", indent, tag));
            }
            Value::Null => out.push_str(&format!("{}<{}/>\n", indent, tag)),
            Value::String(s) => {
                out.push_str(&format!("{}<{}>{}</{}>\n", indent, tag, escape_xml(s), tag))
            }
            other => out.push_str(&format!("{}<{}>{}</{}>\n", indent, tag, other, tag)),
        }
    }

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    match value {
        Value::Array(_) => {
            out.push_str("<root>\n");
            element(&mut out, "item", value, 1);
            out.push_str("</root>\n");
        }
        _ => element(&mut out, "root", value, 0),
    }
    out
}

const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLUMNS: usize = 16_384;

/// Zero-based worksheet coordinates, rejected past the sheet limits.
fn xlsx_cell(row: usize, col: usize) -> Result<(u32, u16), ConverterError> {
    let row = u32::try_from(row)
        .ok()
        .filter(|_| row < XLSX_MAX_ROWS)
        .ok_or_else(|| {
            ConverterError::encode(format!("xlsx: more than {} rows", XLSX_MAX_ROWS))
        })?;
    let col = u16::try_from(col)
        .ok()
        .filter(|_| col < XLSX_MAX_COLUMNS)
        .ok_or_else(|| {
            ConverterError::encode(format!("xlsx: more than {} columns", XLSX_MAX_COLUMNS))
        })?;
    Ok((row, col))
}

fn write_xlsx(value: &Value) -> Result<Vec<u8>, ConverterError> {
    let rows = records(value);
    let columns = columns(&rows);
    xlsx_cell(rows.len(), columns.len().saturating_sub(1))?;
    let encode = |e: rust_xlsxwriter::XlsxError| ConverterError::encode(format!("xlsx: {}", e));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1").map_err(encode)?;

    for (col, name) in columns.iter().enumerate() {
        let (r, col) = xlsx_cell(0, col)?;
        sheet.write_string(r, col, name.as_str()).map_err(encode)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, name) in columns.iter().enumerate() {
            let (r, col) = xlsx_cell(r + 1, col)?;
            match row.get(name) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(f) => {
                        sheet.write_number(r, col, f).map_err(encode)?;
                    }
                    None => {
                        sheet.write_string(r, col, n.to_string()).map_err(encode)?;
                    }
                },
                Some(Value::Bool(b)) => {
                    sheet.write_boolean(r, col, *b).map_err(encode)?;
                }
                Some(other) => {
                    sheet
                        .write_string(r, col, cell_text(Some(other)))
                        .map_err(encode)?;
                }
            }
        }
    }
    workbook.save_to_buffer().map_err(encode)
}

pub(crate) fn markdown_to_html(markdown: &str) -> String {
    use pulldown_cmark::{html, Options, Parser};
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

fn html_document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>\n{}</body></html>\n",
        body
    )
}

#[async_trait]
impl CategoryConverter for DataConverter {
    fn name(&self) -> &str {
        "data"
    }

    async fn attempt(
        &self,
        job: &Job,
        variant: &StrategyVariant,
        staging: &Staging,
    ) -> Result<ConverterOutput, ConverterError> {
        let recipe = match &variant.recipe {
            Recipe::Data(recipe) => recipe,
            other => return Err(ConverterError::unsupported_recipe(self.name(), other.family())),
        };
        let mime = mime_for(&job.target_format);

        match recipe {
            DataRecipe::Reshape { reader, writer } => {
                let (reader, writer) = (*reader, *writer);
                let bytes = job.source.bytes.clone();
                let (output, rows) = tokio::task::spawn_blocking(move || {
                    let value = read(reader, &bytes)?;
                    let rows = value.as_array().map(Vec::len);
                    Ok::<_, ConverterError>((write(writer, &value)?, rows))
                })
                .await
                .map_err(|e| ConverterError::encode(e.to_string()))??;

                let mut result = ConverterOutput::new(Artifact::new(output, mime));
                if let Some(rows) = rows {
                    result = result.with_details(format!("{} rows", rows));
                }
                Ok(result)
            }
            DataRecipe::MarkdownToHtml => {
                let html = markdown_to_html(utf8(&job.source.bytes)?);
                Ok(ConverterOutput::new(Artifact::new(html.into_bytes(), mime)))
            }
            DataRecipe::HtmlToMarkdown => {
                let markdown = html2md::parse_html(utf8(&job.source.bytes)?);
                Ok(ConverterOutput::new(Artifact::new(markdown.into_bytes(), mime)))
            }
            DataRecipe::MarkdownToPdf { tool } => {
                let html = html_document(&markdown_to_html(utf8(&job.source.bytes)?));
                let input = staging.path("document.html");
                tokio::fs::write(&input, html).await?;

                let program = self.config.tool_path(&tool.program);
                let args = tool.render(&input, &staging.output("pdf"), &staging.outdir());
                self.runner
                    .run(&program, &args, self.config.timeout())
                    .await?;
                let produced = find_output(&staging.outdir(), "pdf").await.ok_or_else(|| {
                    ConverterError::tool_failed(tool_name(&program), "no .pdf file produced", None)
                })?;
                let bytes = tokio::fs::read(&produced).await?;
                Ok(ConverterOutput::new(Artifact::new(bytes, mime)))
            }
            DataRecipe::MarkdownTextPdf => {
                let text = strip_tags(&markdown_to_html(utf8(&job.source.bytes)?));
                Ok(ConverterOutput::new(Artifact::new(text_to_pdf(&text), mime)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_to_json_keeps_column_order() {
        let value = read(DataReader::Csv { flexible: false }, b"name,age\nAna,31\nBo,4\n").unwrap();
        assert_eq!(value, json!([{"name": "Ana", "age": "31"}, {"name": "Bo", "age": "4"}]));
        let text = String::from_utf8(write(DataWriter::Json, &value).unwrap()).unwrap();
        assert!(text.find("name").unwrap() < text.find("age").unwrap());
    }

    #[test]
    fn test_ragged_csv_needs_lenient_reader() {
        let input = b"a,b\n1,2,3\n4\n";
        let err = read(DataReader::Csv { flexible: false }, input).unwrap_err();
        assert!(matches!(err, ConverterError::Decode { .. }));

        let value = read(DataReader::Csv { flexible: true }, input).unwrap();
        assert_eq!(
            value,
            json!([{"a": "1", "b": "2", "field_3": "3"}, {"a": "4", "b": ""}])
        );
    }

    #[test]
    fn test_json_to_csv_unions_columns() {
        let value = json!([{"id": 1, "tags": ["x"]}, {"id": 2, "note": null, "ok": true}]);
        let csv = String::from_utf8(write(DataWriter::Csv, &value).unwrap()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "id,tags,note,ok");
        assert_eq!(lines[1], "1,\"[\"\"x\"\"]\",,");
        assert_eq!(lines[2], "2,,,true");
    }

    #[test]
    fn test_scalar_json_to_csv() {
        let csv = String::from_utf8(write(DataWriter::Csv, &json!(42)).unwrap()).unwrap();
        assert_eq!(csv, "value\n42\n");
    }

    #[test]
    fn test_xml_to_json_groups_repeated_elements() {
        let xml = b"<rows><row><id>1</id></row><row><id>2</id></row></rows>";
        let value = read(DataReader::Xml, xml).unwrap();
        assert_eq!(value, json!({"row": [{"id": "1"}, {"id": "2"}]}));

        let csv = String::from_utf8(write(DataWriter::Csv, &value).unwrap()).unwrap();
        assert_eq!(csv, "id\n1\n2\n");
    }

    #[test]
    fn test_invalid_xml_is_decode_error() {
        assert!(matches!(
            read(DataReader::Xml, b"<open>").unwrap_err(),
            ConverterError::Decode { .. }
        ));
    }

    #[test]
    fn test_json_to_xml_escapes() {
        let xml = write_xml(&json!({"title": "a < b", "1st": true}));
        assert!(xml.contains("<title>a &lt; b</title>"));
        assert!(xml.contains("<_1st>true</_1st>"));
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }

    #[test]
    fn test_json_array_to_xml_is_well_formed() {
        let xml = write_xml(&json!([{"a": 1}, {"a": 2}]));
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().children().filter(|n| n.is_element()).count(), 2);
    }

    #[test]
    fn test_yaml_json_round() {
        let value = read(DataReader::Yaml, b"name: demo\nports:\n  - 80\n  - 443\n").unwrap();
        assert_eq!(value, json!({"name": "demo", "ports": [80, 443]}));
        let yaml = String::from_utf8(write(DataWriter::Yaml, &value).unwrap()).unwrap();
        assert!(yaml.contains("name: demo"));
    }

    #[test]
    fn test_xlsx_written_and_read_back() {
        let value = json!([{"city": "Lisbon", "pop": 545000}, {"city": "Porto", "pop": 232000}]);
        let xlsx = write(DataWriter::Xlsx, &value).unwrap();
        assert_eq!(&xlsx[..2], b"PK");

        let back = read(DataReader::Xlsx, &xlsx).unwrap();
        assert_eq!(back[0]["city"], json!("Lisbon"));
        assert_eq!(back[1]["pop"].as_f64(), Some(232000.0));
    }

    #[test]
    fn test_xlsx_cell_limits() {
        assert_eq!(xlsx_cell(0, 16_383).unwrap(), (0, 16_383));
        assert_eq!(xlsx_cell(1_048_575, 0).unwrap(), (1_048_575, 0));
        assert!(matches!(
            xlsx_cell(0, 16_384),
            Err(ConverterError::Encode { .. })
        ));
        assert!(matches!(
            xlsx_cell(1_048_576, 0),
            Err(ConverterError::Encode { .. })
        ));
        // Would wrap to column 0 with a plain cast.
        assert!(xlsx_cell(0, 65_536).is_err());
    }

    #[test]
    fn test_xlsx_rejects_too_many_columns() {
        let row: Map<String, Value> = (0..=16_384)
            .map(|i| (format!("c{}", i), json!(i)))
            .collect();
        let err = write_xlsx(&Value::Array(vec![Value::Object(row)])).unwrap_err();
        assert!(matches!(err, ConverterError::Encode { .. }));
        assert!(err.to_string().contains("16384 columns"));
    }

    #[test]
    fn test_markdown_to_html() {
        let html = markdown_to_html("# Title\n\n*hi*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>hi</em>"));
    }

    struct NoTools;

    #[async_trait]
    impl ProcessRunner for NoTools {
        async fn run(
            &self,
            program: &std::path::Path,
            _args: &[String],
            _limit: std::time::Duration,
        ) -> Result<crate::converter::ProcessOutput, ConverterError> {
            Err(ConverterError::ToolNotFound {
                tool: tool_name(program),
                path: program.to_path_buf(),
            })
        }
    }

    async fn attempt(
        name: &str,
        bytes: &[u8],
        target: &str,
        label: &str,
    ) -> Result<ConverterOutput, ConverterError> {
        use crate::classifier::classify;
        use crate::job::{ConversionOptions, SourceFile};

        let source = SourceFile::new(name, "", bytes.to_vec());
        let classification = classify(&source).unwrap();
        let job = Job::new(source, &classification, ConversionOptions::new(target));
        let variant = crate::strategy::variants(
            job.category,
            &job.source_format,
            &job.target_format,
            &job.options,
        )
        .unwrap()
            .into_iter()
            .find(|v| v.label == label)
            .unwrap();

        let root = tempfile::tempdir().unwrap();
        let staging = Staging::prepare(root.path(), &job, 0).await.unwrap();
        let converter = DataConverter::new(ConverterConfig::default(), Arc::new(NoTools));
        converter.attempt(&job, &variant, &staging).await
    }

    #[tokio::test]
    async fn test_reshape_reports_rows() {
        let output = attempt("people.csv", b"name\nAna\nBo\n", "json", "csv-strict").await.unwrap();
        assert_eq!(output.artifact.mime, "application/json");
        assert_eq!(output.details.as_deref(), Some("2 rows"));
    }

    #[tokio::test]
    async fn test_markdown_pdf_without_office_suite() {
        let err = attempt("readme.md", b"# Hi", "pdf", "html-libreoffice").await.unwrap_err();
        assert!(err.is_resource_unavailable());

        let output = attempt("readme.md", b"# Hi", "pdf", "text-pdf").await.unwrap();
        assert!(String::from_utf8_lossy(&output.artifact.bytes).contains("(Hi) Tj"));
    }

    #[test]
    fn test_bom_is_ignored() {
        let value = read(DataReader::Json, "\u{feff}{\"a\":1}".as_bytes()).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }
}
