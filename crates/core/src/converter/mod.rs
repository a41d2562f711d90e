//! Category converters.
//!
//! Each converter runs a single [`StrategyVariant`](crate::strategy::StrategyVariant)
//! for a job inside a [`Staging`] directory. Choosing variants, retrying and
//! cleaning up is the executor's job; converters only report how one
//! attempt went.
//!
//! - [`MediaConverter`]: audio and video through ffmpeg
//! - [`ImageConverter`]: raster formats in process, SVG tracing via vtracer
//! - [`DocumentConverter`]: PDF, DOCX and plain text
//! - [`DataConverter`]: CSV, JSON, YAML, XML, XLSX, Markdown and HTML
//!
//! # Example
//!
//! ```ignore
//! use archlight_core::converter::{ConverterConfig, ImageConverter, Staging, TokioProcessRunner};
//!
//! let converter = ImageConverter::new(ConverterConfig::default(), Arc::new(TokioProcessRunner));
//! let staging = Staging::prepare(&config.temp_dir, &job, 0).await?;
//! let output = converter.attempt(&job, &variants[0], &staging).await;
//! staging.release()?;
//! ```

mod capabilities;
mod config;
mod data;
mod document;
mod error;
mod image;
mod media;
mod process;
mod staging;
mod text;
mod traits;

pub use capabilities::{Transcoder, TranscoderCapabilities, TranscoderHandle};
pub use config::ConverterConfig;
pub use data::DataConverter;
pub use document::DocumentConverter;
pub use error::ConverterError;
pub use media::MediaConverter;
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use self::image::ImageConverter;
pub use staging::Staging;
pub use text::{build_docx, docx_text, text_to_pdf};
pub use traits::CategoryConverter;
