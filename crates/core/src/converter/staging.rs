//! Per-attempt scratch directories.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::error::ConverterError;
use crate::job::Job;

/// Scratch space for one strategy attempt.
///
/// Named `job-<id>-<attempt>-<random>` under the staging root, so concurrent
/// jobs never share files. The directory and everything in it is removed by
/// [`Staging::release`], or on drop if the attempt is abandoned.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    input: PathBuf,
}

impl Staging {
    /// Create the directory and write the job's input bytes into it.
    pub async fn prepare(root: &Path, job: &Job, attempt: usize) -> Result<Self, ConverterError> {
        tokio::fs::create_dir_all(root).await.map_err(|e| {
            ConverterError::staging(format!("cannot create {}: {}", root.display(), e))
        })?;

        let prefix = format!("job-{}-{}-", job.id, attempt);
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root)
            .map_err(|e| ConverterError::staging(e.to_string()))?;

        let input = dir.path().join(format!("input.{}", job.source_format));
        tokio::fs::write(&input, &job.source.bytes)
            .await
            .map_err(|e| ConverterError::staging(format!("cannot write input: {}", e)))?;
        tokio::fs::create_dir(dir.path().join("out"))
            .await
            .map_err(|e| ConverterError::staging(e.to_string()))?;

        Ok(Self { dir, input })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// The staged copy of the source file.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Default output path for `extension`.
    pub fn output(&self, extension: &str) -> PathBuf {
        self.dir.path().join(format!("output.{}", extension))
    }

    /// Directory for tools that pick their own output names.
    pub fn outdir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Any other scratch file.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory.
    pub fn release(self) -> Result<(), ConverterError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            ConverterError::staging(format!("cannot remove {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::job::{ConversionOptions, SourceFile};

    fn job() -> Job {
        let source = SourceFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let classification = classify(&source).unwrap();
        Job::new(source, &classification, ConversionOptions::new("pdf"))
    }

    #[tokio::test]
    async fn test_prepare_writes_input() {
        let root = tempfile::tempdir().unwrap();
        let job = job();
        let staging = Staging::prepare(root.path(), &job, 0).await.unwrap();

        assert_eq!(std::fs::read(staging.input()).unwrap(), b"hello");
        assert!(staging.outdir().is_dir());
        let name = staging.dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("job-{}-0-", job.id)));
    }

    #[tokio::test]
    async fn test_release_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let staging = Staging::prepare(root.path(), &job(), 1).await.unwrap();
        std::fs::write(staging.output("pdf"), b"partial").unwrap();
        let dir = staging.dir().to_path_buf();

        staging.release().unwrap();
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_attempt_gets_distinct_directories() {
        let root = tempfile::tempdir().unwrap();
        let job = job();
        let a = Staging::prepare(root.path(), &job, 0).await.unwrap();
        let b = Staging::prepare(root.path(), &job, 0).await.unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[tokio::test]
    async fn test_drop_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let staging = Staging::prepare(root.path(), &job(), 0).await.unwrap();
            staging.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }
}
