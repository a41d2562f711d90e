//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration shared by the category converters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Paths for other external tools, keyed by tool name
    /// (`pdftotext`, `libreoffice`, `vtracer`, ...). Unlisted tools are
    /// looked up on `PATH`.
    #[serde(default)]
    pub tools: HashMap<String, PathBuf>,

    /// Root under which each attempt gets its own scratch directory.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Timeout for a single external tool run in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Colour of the generated background when audio is muxed into video.
    #[serde(default = "default_background_color")]
    pub background_color: String,

    /// Size of that background, `WIDTHxHEIGHT`.
    #[serde(default = "default_background_size")]
    pub background_size: String,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("archlight-staging")
}

fn default_timeout() -> u64 {
    600
}

fn default_background_color() -> String {
    "black".to_string()
}

fn default_background_size() -> String {
    "1280x720".to_string()
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            tools: HashMap::new(),
            temp_dir: default_temp_dir(),
            timeout_secs: default_timeout(),
            background_color: default_background_color(),
            background_size: default_background_size(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}

impl ConverterConfig {
    /// Binary to run for `tool`.
    pub fn tool_path(&self, tool: &str) -> PathBuf {
        if tool == "ffmpeg" {
            return self.ffmpeg_path.clone();
        }
        self.tools
            .get(tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(tool))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed background size; falls back to 1280x720 on malformed input.
    pub fn background_dimensions(&self) -> (u32, u32) {
        self.background_size
            .split_once('x')
            .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
            .filter(|(w, h): &(u32, u32)| *w > 0 && *h > 0)
            .unwrap_or((1280, 720))
    }

    /// Background colour as RGB, `None` when it is neither `#rrggbb`,
    /// `0xrrggbb` nor a known colour name.
    pub fn background_rgb(&self) -> Option<[u8; 3]> {
        parse_color(&self.background_color)
    }

    /// Sets the ffmpeg binary.
    pub fn with_ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = path;
        self
    }

    /// Overrides the binary for one tool.
    pub fn with_tool(mut self, tool: impl Into<String>, path: PathBuf) -> Self {
        self.tools.insert(tool.into(), path);
        self
    }

    /// Sets the staging root.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn parse_color(color: &str) -> Option<[u8; 3]> {
    let color = color.trim().to_ascii_lowercase();
    if let Some(hex) = color.strip_prefix('#').or_else(|| color.strip_prefix("0x")) {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return match (channel(0), channel(2), channel(4)) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            _ => None,
        };
    }
    match color.as_str() {
        "white" => Some([255, 255, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "black" => Some([0, 0, 0]),
        _ => None,
    }
}
