//! External process execution.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::error::ConverterError;

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs external tools.
///
/// A non-zero exit status is reported as [`ConverterError::ToolFailed`]
/// carrying the tail of stderr.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<ProcessOutput, ConverterError>;
}

/// Runs tools with `tokio::process`; children are killed when the time
/// limit elapses.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

/// Keep only the last few stderr lines in errors.
const STDERR_TAIL_LINES: usize = 12;

pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}

fn stderr_tail(stderr: &str) -> Option<String> {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return None;
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    Some(lines[start..].join("\n"))
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<ProcessOutput, ConverterError> {
        let tool = tool_name(program);
        debug!(tool = %tool, ?args, "Spawning tool");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::ToolNotFound {
                        tool: tool.clone(),
                        path: program.to_path_buf(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConverterError::Timeout {
                    tool,
                    timeout_secs: limit.as_secs(),
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ConverterError::tool_failed(
                tool,
                format!("exited with code: {:?}", output.status.code()),
                stderr_tail(&stderr),
            ));
        }

        Ok(ProcessOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_tool_name_from_path() {
        assert_eq!(tool_name(Path::new("/usr/bin/ffmpeg")), "ffmpeg");
        assert_eq!(tool_name(Path::new("pdftotext")), "pdftotext");
    }

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&stderr).unwrap();
        assert!(tail.starts_with("line 8"));
        assert!(tail.ends_with("line 19"));
        assert_eq!(stderr_tail("\n  \n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let runner = TokioProcessRunner;
        let err = runner
            .run(
                &PathBuf::from("/nonexistent/archlight-tool"),
                &[],
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConverterError::ToolNotFound { ref tool, .. } if tool == "archlight-tool"
        ));
    }
}
