//! Reduction of attempt outcomes into a job outcome.

use std::ops::ControlFlow;

use super::error::ConversionError;
use crate::converter::ConverterError;
use crate::job::ConverterOutput;

/// How one strategy attempt went.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(ConverterOutput),
    Failure(ConverterError),
}

impl From<Result<ConverterOutput, ConverterError>> for AttemptOutcome {
    fn from(result: Result<ConverterOutput, ConverterError>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Accumulates attempts in variant order.
///
/// The first success settles the job. Each failure replaces the previous
/// one, so when nothing succeeds the reported cause is the last variant's.
#[derive(Debug, Default)]
pub struct Fallback {
    attempts: usize,
    success: Option<(String, ConverterOutput)>,
    last_failure: Option<(String, ConverterError)>,
}

impl Fallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of `variant`. Returns `Break` once settled;
    /// outcomes recorded after that are ignored.
    pub fn record(&mut self, variant: &str, outcome: AttemptOutcome) -> ControlFlow<()> {
        if self.success.is_some() {
            return ControlFlow::Break(());
        }
        self.attempts += 1;
        match outcome {
            AttemptOutcome::Success(output) => {
                self.success = Some((variant.to_string(), output));
                ControlFlow::Break(())
            }
            AttemptOutcome::Failure(err) => {
                self.last_failure = Some((variant.to_string(), err));
                ControlFlow::Continue(())
            }
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn is_settled(&self) -> bool {
        self.success.is_some()
    }

    /// The winning variant and its output, or the last failure.
    pub fn finish(self) -> Result<(String, ConverterOutput), ConversionError> {
        if let Some(success) = self.success {
            return Ok(success);
        }
        let (variant, cause) = self.last_failure.unwrap_or_else(|| {
            (
                String::new(),
                ConverterError::invalid_input("no strategy variant was attempted"),
            )
        });
        Err(ConversionError::Failed {
            attempts: self.attempts,
            variant,
            cause,
        })
    }

    /// Fold labelled outcomes, stopping at the first success.
    pub fn reduce<I, S>(outcomes: I) -> Result<(String, ConverterOutput), ConversionError>
    where
        I: IntoIterator<Item = (S, AttemptOutcome)>,
        S: AsRef<str>,
    {
        let mut fallback = Self::new();
        for (variant, outcome) in outcomes {
            if fallback.record(variant.as_ref(), outcome).is_break() {
                break;
            }
        }
        fallback.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Artifact;

    fn ok(body: &'static [u8]) -> AttemptOutcome {
        AttemptOutcome::Success(ConverterOutput::new(Artifact::new(body, "text/plain")))
    }

    fn fail(reason: &str) -> AttemptOutcome {
        AttemptOutcome::Failure(ConverterError::encode(reason))
    }

    #[test]
    fn test_first_success_wins() {
        let (variant, output) =
            Fallback::reduce(vec![("a", fail("one")), ("b", ok(b"two")), ("c", ok(b"three"))])
                .unwrap();
        assert_eq!(variant, "b");
        assert_eq!(&output.artifact.bytes[..], b"two");
    }

    #[test]
    fn test_last_error_wins() {
        let err = Fallback::reduce(vec![("a", fail("first")), ("b", fail("second"))]).unwrap_err();
        match err {
            ConversionError::Failed {
                attempts,
                variant,
                cause,
            } => {
                assert_eq!(attempts, 2);
                assert_eq!(variant, "b");
                assert_eq!(cause.to_string(), "Failed to encode output: second");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_record_after_success_is_ignored() {
        let mut fallback = Fallback::new();
        assert!(fallback.record("a", ok(b"x")).is_break());
        assert!(fallback.record("b", fail("late")).is_break());
        assert_eq!(fallback.attempts(), 1);
        assert!(fallback.is_settled());
        assert_eq!(fallback.finish().unwrap().0, "a");
    }

    #[test]
    fn test_nothing_attempted() {
        let err = Fallback::reduce(Vec::<(&str, AttemptOutcome)>::new()).unwrap_err();
        assert!(matches!(err, ConversionError::Failed { attempts: 0, .. }));
    }
}
