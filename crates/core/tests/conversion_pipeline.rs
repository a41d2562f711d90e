//! Conversion pipeline integration tests.
//!
//! These tests drive the executor and the session with scripted converters:
//! - Every routed pair reaches a converter
//! - Variant ordering and last-error reporting
//! - Staging isolation between concurrent jobs
//! - Native conversions end to end

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use archlight_core::{
    classifier::{Category, Classification},
    converter::ConverterConfig,
    strategy::{self, audio_quality_index, image_quality, normalize_quality},
    testing::{fixtures, ScriptedConverter},
    ConversionError, ConversionOptions, ConverterSet, Executor, Job, Session, SessionError,
    SourceFile,
};

/// Executor over a single scripted converter, staging under a temp dir.
struct TestHarness {
    executor: Arc<Executor>,
    converter: Arc<ScriptedConverter>,
    temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_converter(ScriptedConverter::new())
    }

    fn with_converter(converter: ScriptedConverter) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = ConverterConfig::default().with_temp_dir(temp_dir.path().to_path_buf());
        let converter = Arc::new(converter);
        let executor = Arc::new(Executor::new(
            &config,
            ConverterSet::uniform(converter.clone()),
        ));
        Self {
            executor,
            converter,
            temp_dir,
        }
    }

    fn session(&self) -> Session {
        Session::builder(Arc::clone(&self.executor)).build()
    }

    /// Entries left under the staging root.
    fn staging_leftovers(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path())
            .map(|dir| dir.count())
            .unwrap_or(0)
    }
}

fn job(name: &str, target: &str) -> Job {
    fixtures::job(name, "", b"input bytes".to_vec(), target).expect("recognized file")
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_every_routed_pair_converts() {
    let harness = TestHarness::new();

    for category in Category::ALL {
        for (source, target) in strategy::pairs(category) {
            let file = SourceFile::new(format!("input.{}", source), "", b"x".to_vec());
            let classification = Classification::new(category, source);
            let job = Job::new(file, &classification, ConversionOptions::new(target));

            let result = harness.executor.execute(&job).await;
            assert!(
                result.is_ok(),
                "{} {} -> {} failed: {:?}",
                category,
                source,
                target,
                result.err()
            );
        }
    }
}

#[tokio::test]
async fn test_unrouted_pair_is_unsupported_without_attempts() {
    let harness = TestHarness::new();

    let err = harness.executor.execute(&job("clip.mp4", "docx")).await.unwrap_err();

    assert!(matches!(err, ConversionError::Unsupported { .. }));
    assert!(harness.converter.attempts().is_empty());
    assert_eq!(harness.staging_leftovers(), 0);
}

#[tokio::test]
async fn test_output_name_replaces_last_extension() {
    let harness = TestHarness::new();

    let result = harness
        .executor
        .execute(&job("report.final.docx", "pdf"))
        .await
        .unwrap();
    assert_eq!(result.output_name, "report.final.pdf");

    let result = harness
        .executor
        .execute(&job("holiday clip.mp4", "mp3"))
        .await
        .unwrap();
    assert_eq!(result.output_name, "holiday clip.mp3");
}

// =============================================================================
// Fallback
// =============================================================================

#[tokio::test]
async fn test_falls_back_to_next_variant() {
    let harness = TestHarness::with_converter(ScriptedConverter::new().fail("mp3-vbr"));

    let result = harness.executor.execute(&job("clip.mp4", "mp3")).await.unwrap();

    assert_eq!(harness.converter.labels(), vec!["mp3-vbr", "mp3-cbr"]);
    assert_eq!(result.artifact.bytes.as_ref(), b"mp3-cbr");
    assert_eq!(result.artifact.mime, "audio/mpeg");
    assert_eq!(result.details.as_deref(), Some("mp3-cbr"));
}

#[tokio::test]
async fn test_first_success_stops_the_walk() {
    let harness = TestHarness::new();

    harness.executor.execute(&job("notes.txt", "pdf")).await.unwrap();

    assert_eq!(harness.converter.labels(), vec!["libreoffice"]);
}

#[tokio::test]
async fn test_last_error_is_reported() {
    let harness = TestHarness::with_converter(
        ScriptedConverter::new().fail("mp3-vbr").fail("mp3-cbr"),
    );

    let err = harness.executor.execute(&job("clip.mp4", "mp3")).await.unwrap_err();

    match err {
        ConversionError::Failed {
            attempts,
            variant,
            cause,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(variant, "mp3-cbr");
            assert!(cause.to_string().contains("mp3-cbr failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_resource_falls_back() {
    let harness = TestHarness::with_converter(
        ScriptedConverter::new()
            .unavailable("libreoffice")
            .unavailable("soffice"),
    );

    let result = harness.executor.execute(&job("notes.txt", "pdf")).await.unwrap();

    assert_eq!(
        harness.converter.labels(),
        vec!["libreoffice", "soffice", "text-pdf"]
    );
    assert_eq!(result.artifact.mime, "application/pdf");
}

#[tokio::test]
async fn test_empty_output_counts_as_failure() {
    let harness = TestHarness::with_converter(ScriptedConverter::new().empty("csv-strict"));

    let result = harness.executor.execute(&job("rows.csv", "json")).await.unwrap();

    assert_eq!(harness.converter.labels(), vec!["csv-strict", "csv-lenient"]);
    assert_eq!(result.artifact.bytes.as_ref(), b"csv-lenient");
}

// =============================================================================
// Staging
// =============================================================================

#[tokio::test]
async fn test_each_attempt_gets_fresh_staging() {
    let harness = TestHarness::with_converter(
        ScriptedConverter::new().fail("pdftotext-layout").fail("pdftotext-raw"),
    );

    harness.executor.execute(&job("scan.pdf", "txt")).await.unwrap();

    let attempts = harness.converter.attempts();
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|a| a.input_staged));

    let mut dirs = harness.converter.staged_dirs();
    dirs.dedup();
    assert_eq!(dirs.len(), 3);
    assert!(dirs.iter().all(|d| !d.exists()));
    assert_eq!(harness.staging_leftovers(), 0);
}

#[tokio::test]
async fn test_concurrent_jobs_do_not_share_staging() {
    let harness = TestHarness::with_converter(
        ScriptedConverter::new().with_delay(Duration::from_millis(20)),
    );

    let jobs: Vec<Job> = (0..6)
        .map(|i| job(&format!("clip-{}.mp4", i), "mp3"))
        .collect();
    let results = futures::future::join_all(
        jobs.iter().map(|job| harness.executor.execute(job)),
    )
    .await;

    assert!(results.iter().all(|r| r.is_ok()));

    let attempts = harness.converter.attempts();
    assert_eq!(attempts.len(), 6);
    let mut dirs = harness.converter.staged_dirs();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 6);
    for attempt in &attempts {
        assert!(attempt.staging_dir.starts_with(harness.temp_dir.path()));
        assert!(!attempt.staging_dir.exists());
    }
    assert_eq!(harness.staging_leftovers(), 0);
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_session_refuses_targets_not_offered() {
    let harness = TestHarness::new();
    let session = harness.session();

    let file = SourceFile::new("song.mp3", "audio/mpeg", b"id3".to_vec());
    let err = session
        .convert(file, ConversionOptions::new("pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::TargetNotOffered { .. }));
    assert!(harness.converter.attempts().is_empty());
    assert!(session.history().await.is_empty());
}

#[tokio::test]
async fn test_session_failure_leaves_no_trace() {
    let harness = TestHarness::with_converter(
        ScriptedConverter::new().fail("mp3-vbr").fail("mp3-cbr"),
    );
    let session = harness.session();

    let file = SourceFile::new("clip.mp4", "video/mp4", b"ftyp".to_vec());
    let err = session
        .convert(file, ConversionOptions::new("mp3"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Conversion(ConversionError::Failed { .. })
    ));
    assert!(session.history().await.is_empty());
    assert_eq!(session.cache().memory_len().await, 0);
}

// =============================================================================
// Tuning
// =============================================================================

#[test]
fn test_bitrate_maps_to_audio_quality() {
    assert_eq!(audio_quality_index(Some(256)), 8);
    assert_eq!(audio_quality_index(Some(16)), 1);
    assert_eq!(audio_quality_index(None), 2);
}

#[test]
fn test_quality_is_normalized() {
    assert_eq!(normalize_quality(Some(0)), 0.01);
    assert_eq!(normalize_quality(Some(150)), 1.0);
    assert_eq!(normalize_quality(None), 0.92);
    assert!(image_quality(Some(90), true, "jpg") <= 0.9);
}

// =============================================================================
// Native converters
// =============================================================================

#[tokio::test]
async fn test_png_to_jpg_with_native_encoder() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = ConverterConfig::default().with_temp_dir(temp_dir.path().to_path_buf());
    let executor = Arc::new(Executor::from_config(&config));
    let session = Session::builder(executor).build();

    let file = SourceFile::new("logo.png", "image/png", fixtures::png_bytes(8, 4));
    let converted = session
        .convert(file, ConversionOptions::new("jpg"))
        .await
        .unwrap();

    let result = converted.result;
    assert_eq!(result.output_name, "logo.jpg");
    assert_eq!(result.artifact.mime, "image/jpeg");
    assert_eq!(&result.artifact.bytes[..2], &[0xFF, 0xD8]);
    assert_eq!(result.details.as_deref(), Some("8x4 · Quality 92%"));
}

#[tokio::test]
async fn test_csv_to_json_with_native_reader() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = ConverterConfig::default().with_temp_dir(temp_dir.path().to_path_buf());
    let executor = Executor::from_config(&config);

    let job = fixtures::job(
        "people.csv",
        "text/csv",
        b"name,age\nada,36\ngrace,45\n".to_vec(),
        "json",
    )
    .expect("recognized file");
    let result = executor.execute(&job).await.unwrap();

    let value: serde_json::Value = serde_json::from_slice(&result.artifact.bytes).unwrap();
    assert_eq!(
        value,
        serde_json::json!([
            {"name": "ada", "age": "36"},
            {"name": "grace", "age": "45"}
        ])
    );
    assert_eq!(result.output_name, "people.json");
}
