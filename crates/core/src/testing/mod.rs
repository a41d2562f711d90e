//! Testing utilities and doubles for integration tests.
//!
//! This module provides stand-ins for the collaborators the pipeline talks
//! to, so the executor, cache and session can be exercised without external
//! tools or real time passing.
//!
//! # Example
//!
//! ```rust,ignore
//! use archlight_core::testing::{ManualClock, ScriptedConverter, UnavailableStore};
//!
//! let clock = Arc::new(ManualClock::new());
//! let converter = Arc::new(ScriptedConverter::new().fail("mp3-vbr"));
//!
//! // Wire them into an Executor and a Session...
//! clock.advance(chrono::Duration::minutes(21));
//! ```

mod manual_clock;
mod scripted_converter;
mod unavailable_store;

pub use manual_clock::ManualClock;
pub use scripted_converter::{RecordedAttempt, ScriptedConverter};
pub use unavailable_store::UnavailableStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    use crate::cache::{CacheEntry, SessionId};
    use crate::classifier::classify;
    use crate::job::{Artifact, ConversionOptions, Job, SourceFile};

    /// Create a job for `name`, classified the way a session would.
    ///
    /// Returns `None` when the file is not recognized.
    pub fn job(name: &str, declared_type: &str, bytes: Vec<u8>, target: &str) -> Option<Job> {
        let source = SourceFile::new(name, declared_type, bytes);
        let classification = classify(&source)?;
        Some(Job::new(source, &classification, ConversionOptions::new(target)))
    }

    /// A PNG of the given size, half opaque red and half transparent.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let mut out = Cursor::new(Vec::new());
        // Writing to memory only fails on encoder bugs.
        let _ = image.write_to(&mut out, ImageFormat::Png);
        out.into_inner()
    }

    /// Create a cache entry with a small text artifact.
    pub fn cache_entry(id: &str, session_id: &SessionId, created_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            id: id.to_string(),
            session_id: session_id.clone(),
            created_at,
            output_name: format!("{}.txt", id),
            details: Some(format!("{} characters", id.len())),
            artifact: Artifact::new(id.as_bytes().to_vec(), "text/plain"),
        }
    }
}
