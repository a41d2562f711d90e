//! Audio and video routes, all run through ffmpeg.

use super::tuning::audio_quality_index;
use super::{Route, StrategyVariant, Target};
use crate::job::ConversionOptions;

/// An ffmpeg attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRecipe {
    /// `ffmpeg -y -i <input> <args> <output>`.
    Transcode { args: Vec<String> },
    /// Mux an audio-only input over a still background picture.
    ///
    /// The converter first asks ffmpeg to generate a solid colour source and,
    /// when that generator is unavailable, loops a rasterized placeholder
    /// image instead. `args` encode the resulting video and audio streams.
    AudioOverBackground { args: Vec<String> },
}

pub(super) const ROUTES: &[Route] = &[
    Route {
        source: "mp4",
        targets: &[
            Target { format: "mp3", build: to_mp3 },
            Target { format: "webm", build: to_webm },
            Target { format: "gif", build: to_gif },
        ],
    },
    Route {
        source: "webm",
        targets: &[
            Target { format: "mp4", build: to_mp4 },
            Target { format: "mp3", build: to_mp3 },
        ],
    },
    Route {
        source: "mp3",
        targets: &[
            Target { format: "wav", build: to_wav },
            Target { format: "ogg", build: to_ogg },
            Target { format: "mp4", build: to_mp4 },
        ],
    },
    Route {
        source: "wav",
        targets: &[
            Target { format: "mp3", build: to_mp3 },
            Target { format: "ogg", build: to_ogg },
            Target { format: "mp4", build: to_mp4 },
        ],
    },
    Route {
        source: "ogg",
        targets: &[
            Target { format: "mp3", build: to_mp3 },
            Target { format: "wav", build: to_wav },
        ],
    },
];

fn is_audio(format: &str) -> bool {
    matches!(format, "mp3" | "wav" | "ogg")
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn transcode(label: &str, items: Vec<String>) -> StrategyVariant {
    StrategyVariant::new(label, MediaRecipe::Transcode { args: items })
}

fn to_mp3(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let index = audio_quality_index(options.bitrate_kbps);
    let bitrate = options.bitrate_kbps.filter(|b| *b > 0).unwrap_or(192);
    vec![
        transcode(
            "mp3-vbr",
            args(&["-vn", "-c:a", "libmp3lame", "-aq", &index.to_string()]),
        ),
        transcode(
            "mp3-cbr",
            args(&["-vn", "-c:a", "libmp3lame", "-b:a", &format!("{}k", bitrate)]),
        ),
    ]
}

fn to_wav(_source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    vec![
        transcode("wav-pcm16", args(&["-vn", "-c:a", "pcm_s16le"])),
        transcode("wav-default", args(&["-vn"])),
    ]
}

fn to_ogg(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let bitrate = options.bitrate_kbps.filter(|b| *b > 0).unwrap_or(128);
    vec![
        transcode("ogg-vorbis", args(&["-vn", "-c:a", "libvorbis", "-q:a", "5"])),
        transcode(
            "ogg-opus",
            args(&["-vn", "-c:a", "libopus", "-b:a", &format!("{}k", bitrate)]),
        ),
    ]
}

fn to_webm(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let bitrate = format!("{}k", options.bitrate_kbps.filter(|b| *b > 0).unwrap_or(1200));
    vec![
        transcode(
            "webm-vp9",
            args(&["-c:v", "libvpx-vp9", "-b:v", &bitrate, "-c:a", "libopus"]),
        ),
        transcode(
            "webm-vp8",
            args(&["-c:v", "libvpx", "-b:v", &bitrate, "-c:a", "libvorbis"]),
        ),
    ]
}

fn to_mp4(source: &str, _options: &ConversionOptions) -> Vec<StrategyVariant> {
    if is_audio(source) {
        return vec![
            StrategyVariant::new(
                "mp4-still-h264",
                MediaRecipe::AudioOverBackground {
                    args: args(&[
                        "-c:v",
                        "libx264",
                        "-tune",
                        "stillimage",
                        "-pix_fmt",
                        "yuv420p",
                        "-c:a",
                        "aac",
                        "-b:a",
                        "192k",
                    ]),
                },
            ),
            StrategyVariant::new(
                "mp4-still-mpeg4",
                MediaRecipe::AudioOverBackground {
                    args: args(&["-c:v", "mpeg4", "-pix_fmt", "yuv420p", "-c:a", "aac"]),
                },
            ),
        ];
    }

    vec![
        transcode(
            "mp4-h264",
            args(&[
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
            ]),
        ),
        transcode(
            "mp4-mpeg4",
            args(&["-c:v", "mpeg4", "-q:v", "5", "-c:a", "aac"]),
        ),
    ]
}

fn to_gif(_source: &str, options: &ConversionOptions) -> Vec<StrategyVariant> {
    let fps = options.frame_rate.filter(|f| *f > 0).unwrap_or(12);
    let width = options.width.filter(|w| *w > 0).unwrap_or(480);
    vec![
        transcode(
            "gif-lanczos",
            args(&[
                "-vf",
                &format!("fps={},scale={}:-1:flags=lanczos", fps, width),
                "-loop",
                "0",
            ]),
        ),
        transcode(
            "gif-bilinear",
            args(&["-vf", &format!("fps={},scale={}:-1", fps, width)]),
        ),
    ]
}
