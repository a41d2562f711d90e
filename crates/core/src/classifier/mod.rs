//! Format classification.
//!
//! Maps a selected file to its converter category, canonical source format
//! and the ordered list of targets the strategy tables can reach.

mod formats;
mod types;

pub use formats::{format_for_mime, mime_for, normalize_format};
pub use types::{Category, Classification};

use formats::{SHEET_MIME, WORD_MIME};

use crate::job::SourceFile;
use crate::strategy;

/// Declared media types accepted per category, checked in this order.
const DECLARED_TYPES: &[(Category, &[&str])] = &[
    (
        Category::Image,
        &[
            "image/png",
            "image/jpeg",
            "image/webp",
            "image/gif",
            "image/bmp",
            "image/svg+xml",
        ],
    ),
    (
        Category::Document,
        &["application/pdf", "text/plain", WORD_MIME],
    ),
    (
        Category::Media,
        &[
            "video/mp4",
            "video/webm",
            "audio/mpeg",
            "audio/wav",
            "audio/x-wav",
            "audio/ogg",
        ],
    ),
    (
        Category::Data,
        &["text/csv", "application/json", SHEET_MIME, "text/xml"],
    ),
    (
        Category::Code,
        &[
            "application/json",
            "application/x-yaml",
            "text/yaml",
            "text/html",
            "text/markdown",
        ],
    ),
];

/// Classify a file by declared type first, then by extension.
///
/// Returns `None` when neither identifies a format any category handles.
pub fn classify(file: &SourceFile) -> Option<Classification> {
    let extension = file.extension().map(|ext| normalize_format(&ext));
    let declared = file.declared_type.trim().to_ascii_lowercase();

    if !declared.is_empty() {
        for (category, types) in DECLARED_TYPES {
            if !types.iter().any(|t| declared.starts_with(t)) {
                continue;
            }
            let source_format = extension
                .as_deref()
                .filter(|ext| strategy::routes_source(*category, ext))
                .or_else(|| format_for_mime(&declared));
            if let Some(source_format) = source_format {
                return Some(Classification::new(*category, source_format));
            }
        }
    }

    let extension = extension?;
    Category::ALL
        .into_iter()
        .find(|category| strategy::routes_source(*category, &extension))
        .map(|category| Classification::new(category, extension))
}
