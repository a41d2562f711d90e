//! Plain-text containers: DOCX packages and simple text PDFs.

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::error::ConverterError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && c != '\t' && c != '\n' => {}
            c => out.push(c),
        }
    }
    out
}

/// Build a minimal DOCX with one paragraph per line.
pub fn build_docx(text: &str) -> Result<Vec<u8>, ConverterError> {
    let mut body = String::new();
    for line in text.lines() {
        body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
        body.push_str(&escape_xml(line));
        body.push_str("</w:t></w:r></w:p>");
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        WORD_NS, body
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/document.xml", document.as_str()),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)
            .map_err(|e| ConverterError::encode(format!("docx: {}", e)))?;
        zip.write_all(content.as_bytes())?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| ConverterError::encode(format!("docx: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Extract paragraph text from a DOCX package.
pub fn docx_text(bytes: &[u8]) -> Result<String, ConverterError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConverterError::decode(format!("not a DOCX package: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ConverterError::decode(format!("word/document.xml: {}", e)))?
        .read_to_string(&mut xml)?;

    let doc = roxmltree::Document::parse(&xml)
        .map_err(|e| ConverterError::decode(format!("word/document.xml: {}", e)))?;

    let mut paragraphs = Vec::new();
    for paragraph in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let mut text = String::new();
        for node in paragraph.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "t" => text.push_str(node.text().unwrap_or_default()),
                "tab" => text.push('\t'),
                "br" | "cr" => text.push('\n'),
                _ => {}
            }
        }
        paragraphs.push(text);
    }
    Ok(paragraphs.join("\n"))
}

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const FONT_SIZE: u32 = 11;
const LEADING: u32 = 14;
const WRAP_COLUMNS: usize = 90;

fn wrap_lines(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let raw = raw.replace('\t', "    ");
        if raw.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push(word.drain(..columns).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = current.chars().count()
                + usize::from(!current.is_empty())
                + word.chars().count();
            if needed > columns && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Escape a line for a PDF literal string in WinAnsi encoding.
fn pdf_string(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 2);
    for c in line.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

/// Lay out text on A4 pages in Helvetica.
pub fn text_to_pdf(text: &str) -> Vec<u8> {
    let lines = wrap_lines(text, WRAP_COLUMNS);
    let per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&[]]
    } else {
        lines.chunks(per_page).collect()
    };

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        String::new(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    let mut kids = Vec::new();
    for page in pages {
        let mut content = format!(
            "BT /F1 {} Tf {} TL {} {} Td\n",
            FONT_SIZE,
            LEADING,
            MARGIN,
            PAGE_HEIGHT - MARGIN - FONT_SIZE
        );
        for line in page {
            content.push_str(&format!("({}) Tj T*\n", pdf_string(line)));
        }
        content.push_str("ET");

        let page_id = objects.len() + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH,
            PAGE_HEIGHT,
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
        kids.push(format!("{} 0 R", page_id));
    }
    objects[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        kids.len()
    );

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// Drop tags from rendered HTML, keeping line structure.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_text_round_trip() {
        let docx = build_docx("First line\nR&D <notes>").unwrap();
        assert_eq!(&docx[..2], b"PK");
        assert_eq!(docx_text(&docx).unwrap(), "First line\nR&D <notes>");
    }

    #[test]
    fn test_docx_text_rejects_non_zip() {
        assert!(matches!(
            docx_text(b"plain text").unwrap_err(),
            ConverterError::Decode { .. }
        ));
    }

    #[test]
    fn test_wrap_lines() {
        let lines = wrap_lines("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let lines = wrap_lines("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);

        assert_eq!(wrap_lines("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_pdf_string_escapes() {
        assert_eq!(pdf_string("f(x) = \\y"), "f\\(x\\) = \\\\y");
        assert_eq!(pdf_string("café"), "caf\\351");
        assert_eq!(pdf_string("→"), "?");
    }

    #[test]
    fn test_text_to_pdf_structure() {
        let pdf = text_to_pdf("Hello PDF");
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("(Hello PDF) Tj"));
        assert!(text.contains("/Count 1"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn test_text_to_pdf_paginates() {
        let long: String = (0..120).map(|i| format!("line {}\n", i)).collect();
        let pdf = text_to_pdf(&long);
        assert!(String::from_utf8_lossy(&pdf).contains("/Count 3"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let pdf = text_to_pdf("offsets");
        let text = String::from_utf8_lossy(&pdf).to_string();
        let xref = text.find("xref\n").unwrap();
        let first_entry = text[xref..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<h1>Title</h1>\n<p>a &amp; b</p>"), "Title\na & b");
    }
}
