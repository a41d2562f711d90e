//! Types for the format classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::strategy;

/// Converter family a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Image,
    Document,
    Media,
    Data,
    Code,
}

impl Category {
    /// Every category, in classification precedence order.
    pub const ALL: [Category; 5] = [
        Category::Image,
        Category::Document,
        Category::Media,
        Category::Data,
        Category::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Media => "media",
            Self::Data => "data",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    /// Canonical source format (`jpg`, `yaml`, ...).
    pub source_format: String,
    /// Reachable targets, most useful first.
    pub legal_targets: Vec<String>,
}

impl Classification {
    /// Builds a classification whose targets come straight from the
    /// strategy routes, so every advertised target has a strategy.
    pub fn new(category: Category, source_format: impl Into<String>) -> Self {
        let source_format = source_format.into();
        let legal_targets = strategy::targets(category, &source_format)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            category,
            source_format,
            legal_targets,
        }
    }

    pub fn offers(&self, target_format: &str) -> bool {
        let target = super::normalize_format(target_format);
        self.legal_targets.iter().any(|t| *t == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_as_str() {
        assert_eq!(Category::Image.as_str(), "image");
        assert_eq!(Category::Code.to_string(), "code");
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&Category::Media).unwrap();
        assert_eq!(json, "\"media\"");
    }

    #[test]
    fn test_classification_offers_aliases() {
        let classification = Classification::new(Category::Image, "png");
        assert!(classification.offers("jpg"));
        assert!(classification.offers("JPEG"));
        assert!(!classification.offers("pdf"));
    }
}
