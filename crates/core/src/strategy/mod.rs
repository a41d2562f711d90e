//! Strategy tables.
//!
//! For every (source, target) pair a category can reach, the tables hold an
//! ordered list of [`StrategyVariant`]s. The first variant is the preferred
//! recipe; later ones are progressively more permissive. The classifier's
//! legal targets are read from the same tables, so a target is only ever
//! advertised when at least one variant exists for it.

pub mod data;
pub mod document;
pub mod image;
pub mod media;
pub mod tuning;
mod types;

pub use data::{DataReader, DataRecipe, DataWriter};
pub use document::{DocumentRecipe, TextSink};
pub use self::image::ImageRecipe;
pub use media::MediaRecipe;
pub use tuning::{
    audio_quality_index, image_quality, normalize_quality, TraceParams, VectorizeSettings,
};
pub use types::{RasterFormat, Recipe, StrategyVariant, ToolInvocation};

use crate::classifier::{normalize_format, Category};
use crate::job::ConversionOptions;

/// Builds the variants for one target, given the source format.
pub(crate) type BuildVariants = fn(&str, &ConversionOptions) -> Vec<StrategyVariant>;

pub(crate) struct Target {
    pub format: &'static str,
    pub build: BuildVariants,
}

pub(crate) struct Route {
    pub source: &'static str,
    pub targets: &'static [Target],
}

fn routes(category: Category) -> &'static [Route] {
    match category {
        Category::Image => image::ROUTES,
        Category::Document => document::ROUTES,
        Category::Media => media::ROUTES,
        Category::Data => data::DATA_ROUTES,
        Category::Code => data::CODE_ROUTES,
    }
}

fn route(category: Category, source: &str) -> Option<&'static Route> {
    let source = normalize_format(source);
    routes(category).iter().find(|r| r.source == source)
}

/// Whether `category` converts anything from `source`.
pub fn routes_source(category: Category, source: &str) -> bool {
    route(category, source).is_some()
}

/// Reachable targets from `source`, most useful first.
pub fn targets(category: Category, source: &str) -> Vec<&'static str> {
    route(category, source)
        .map(|r| r.targets.iter().map(|t| t.format).collect())
        .unwrap_or_default()
}

/// Ordered variants for a pair, or `None` when the pair is not routed.
pub fn variants(
    category: Category,
    source: &str,
    target: &str,
    options: &ConversionOptions,
) -> Option<Vec<StrategyVariant>> {
    let source = normalize_format(source);
    let target = normalize_format(target);
    let route = route(category, &source)?;
    let entry = route.targets.iter().find(|t| t.format == target)?;
    let variants = (entry.build)(&source, options);
    if variants.is_empty() {
        None
    } else {
        Some(variants)
    }
}

/// Every routed (source, target) pair of a category.
pub fn pairs(category: Category) -> Vec<(&'static str, &'static str)> {
    routes(category)
        .iter()
        .flat_map(|r| r.targets.iter().map(move |t| (r.source, t.format)))
        .collect()
}
