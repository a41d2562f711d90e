//! Conversion executor.
//!
//! Resolves the category converter for a job, looks up the ordered strategy
//! variants for its format pair and runs them one at a time until one
//! succeeds. Attempt outcomes are folded by [`Fallback`]: the first success
//! wins, and when every variant fails the last failure is reported.

mod error;
mod fallback;
mod runner;

pub use error::ConversionError;
pub use fallback::{AttemptOutcome, Fallback};
pub use runner::{ConverterSet, Executor};
