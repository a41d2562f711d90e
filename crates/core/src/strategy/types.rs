//! Strategy variant types.

use std::path::Path;

use super::data::DataRecipe;
use super::document::DocumentRecipe;
use super::image::ImageRecipe;
use super::media::MediaRecipe;

/// One concrete attempt at converting a format pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyVariant {
    /// Short name used in logs and metrics (`mp3-vbr`, `pdftotext-layout`).
    pub label: String,
    pub recipe: Recipe,
}

impl StrategyVariant {
    pub fn new(label: impl Into<String>, recipe: impl Into<Recipe>) -> Self {
        Self {
            label: label.into(),
            recipe: recipe.into(),
        }
    }
}

/// Declarative description of an attempt, grouped by converter family.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipe {
    Media(MediaRecipe),
    Image(ImageRecipe),
    Document(DocumentRecipe),
    Data(DataRecipe),
}

impl Recipe {
    pub fn family(&self) -> &'static str {
        match self {
            Self::Media(_) => "media",
            Self::Image(_) => "image",
            Self::Document(_) => "document",
            Self::Data(_) => "data",
        }
    }
}

impl From<MediaRecipe> for Recipe {
    fn from(recipe: MediaRecipe) -> Self {
        Self::Media(recipe)
    }
}

impl From<ImageRecipe> for Recipe {
    fn from(recipe: ImageRecipe) -> Self {
        Self::Image(recipe)
    }
}

impl From<DocumentRecipe> for Recipe {
    fn from(recipe: DocumentRecipe) -> Self {
        Self::Document(recipe)
    }
}

impl From<DataRecipe> for Recipe {
    fn from(recipe: DataRecipe) -> Self {
        Self::Data(recipe)
    }
}

/// An external program call with path placeholders.
///
/// Arguments may contain `{input}`, `{output}`, `{output_stem}` (output path
/// without its extension) and `{outdir}`; they are substituted per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Tool name, resolved to a binary through the converter config.
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Substitute placeholders with concrete paths.
    pub fn render(&self, input: &Path, output: &Path, outdir: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output_stem = output.with_extension("");
        let output_stem = output_stem.to_string_lossy();
        let output = output.to_string_lossy();
        let outdir = outdir.to_string_lossy();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output_stem}", &output_stem)
                    .replace("{output}", &output)
                    .replace("{outdir}", &outdir)
            })
            .collect()
    }
}

/// Raster encodings produced natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
}

impl RasterFormat {
    pub fn from_format(format: &str) -> Option<Self> {
        match format {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_render_placeholders() {
        let tool = ToolInvocation::new(
            "pdftoppm",
            &["-png", "-singlefile", "{input}", "{output_stem}"],
        );
        let args = tool.render(
            &PathBuf::from("/stage/input.pdf"),
            &PathBuf::from("/stage/output.png"),
            &PathBuf::from("/stage/out"),
        );
        assert_eq!(
            args,
            vec!["-png", "-singlefile", "/stage/input.pdf", "/stage/output"]
        );
    }

    #[test]
    fn test_render_outdir_inside_argument() {
        let tool = ToolInvocation::new("soffice", &["--outdir", "{outdir}"]).arg("{input}");
        let args = tool.render(
            &PathBuf::from("/s/input.docx"),
            &PathBuf::from("/s/output.pdf"),
            &PathBuf::from("/s/out"),
        );
        assert_eq!(args, vec!["--outdir", "/s/out", "/s/input.docx"]);
    }

    #[test]
    fn test_raster_format_lookup() {
        assert_eq!(RasterFormat::from_format("jpg"), Some(RasterFormat::Jpeg));
        assert_eq!(RasterFormat::from_format("svg"), None);
        assert_eq!(RasterFormat::WebP.mime(), "image/webp");
    }
}
