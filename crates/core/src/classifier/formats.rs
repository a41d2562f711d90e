//! Format names, aliases and MIME types.

pub(crate) const WORD_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub(crate) const SHEET_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Canonical format name for an extension or user-supplied target.
///
/// Lowercases, strips a leading dot and folds aliases (`jpeg` -> `jpg`,
/// `yml` -> `yaml`).
pub fn normalize_format(format: &str) -> String {
    let format = format.trim().trim_start_matches('.').to_ascii_lowercase();
    match format.as_str() {
        "jpeg" | "jpe" => "jpg".to_string(),
        "yml" => "yaml".to_string(),
        "markdown" => "md".to_string(),
        "htm" => "html".to_string(),
        _ => format,
    }
}

/// MIME type of an artifact in `format`.
pub fn mime_for(format: &str) -> &'static str {
    match normalize_format(format).as_str() {
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "docx" => WORD_MIME,
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "csv" => "text/csv",
        "json" => "application/json",
        "xlsx" => SHEET_MIME,
        "xml" => "text/xml",
        "yaml" => "text/yaml",
        "html" => "text/html",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}

/// Format implied by a declared media type, if it names one we know.
pub fn format_for_mime(declared_type: &str) -> Option<&'static str> {
    const TABLE: &[(&str, &str)] = &[
        ("image/png", "png"),
        ("image/jpeg", "jpg"),
        ("image/webp", "webp"),
        ("image/gif", "gif"),
        ("image/bmp", "bmp"),
        ("image/svg+xml", "svg"),
        ("application/pdf", "pdf"),
        ("text/plain", "txt"),
        (WORD_MIME, "docx"),
        ("video/mp4", "mp4"),
        ("video/webm", "webm"),
        ("audio/mpeg", "mp3"),
        ("audio/wav", "wav"),
        ("audio/x-wav", "wav"),
        ("audio/ogg", "ogg"),
        ("text/csv", "csv"),
        ("application/json", "json"),
        (SHEET_MIME, "xlsx"),
        ("text/xml", "xml"),
        ("application/xml", "xml"),
        ("application/x-yaml", "yaml"),
        ("text/yaml", "yaml"),
        ("text/html", "html"),
        ("text/markdown", "md"),
    ];

    let declared = declared_type.trim().to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(mime, _)| declared.starts_with(mime))
        .map(|(_, format)| *format)
}
