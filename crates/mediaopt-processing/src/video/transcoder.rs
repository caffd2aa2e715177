//! VideoTranscoder - bounded H.264/AAC MP4 re-encode.

use crate::traits::{OptimizeError, Optimizer};
use async_trait::async_trait;
use mediaopt_core::constants::OPTIMIZED_VIDEO_CONTENT_TYPE;
use mediaopt_core::{MediaKind, OptimizedArtifact};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Number of trailing stderr lines kept as the failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct VideoTranscoderConfig {
    pub ffmpeg_path: String,
    pub max_width: u32,
    pub max_height: u32,
    pub crf: u8,
    pub preset: String,
    pub audio_bitrate: String,
}

impl Default for VideoTranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            max_width: 1280,
            max_height: 720,
            crf: 24,
            preset: "fast".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

pub struct VideoTranscoder {
    config: VideoTranscoderConfig,
}

impl VideoTranscoder {
    pub fn new(config: VideoTranscoderConfig) -> Self {
        Self { config }
    }

    /// Scale filter that fits the frame inside the bound without upscaling and keeps
    /// both sides even for libx264.
    pub fn scale_filter(&self) -> String {
        format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
            self.config.max_width, self.config.max_height
        )
    }

    pub fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            self.scale_filter(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-crf".to_string(),
            self.config.crf.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.config.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-f".to_string(),
            "mp4".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

/// Last lines of the encoder's stderr, or a placeholder when it wrote nothing.
fn diagnostic(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no diagnostic output".to_string();
    }
    lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..].join("\n")
}

#[async_trait]
impl Optimizer for VideoTranscoder {
    fn kind(&self) -> MediaKind {
        MediaKind::Video
    }

    #[tracing::instrument(skip(self, input, output), fields(ffmpeg = %self.config.ffmpeg_path))]
    async fn optimize(
        &self,
        input: &Path,
        output: &Path,
        deadline: Duration,
    ) -> Result<OptimizedArtifact, OptimizeError> {
        let start = std::time::Instant::now();
        let args = self.build_args(input, output);

        // Dropping the output future on deadline kills the child.
        let run = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(deadline, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    deadline_secs = deadline.as_secs(),
                    "FFmpeg exceeded deadline and was killed"
                );
                return Err(OptimizeError::DeadlineExceeded(deadline));
            }
        };

        let result = result.map_err(|e| OptimizeError::Spawn {
            program: self.config.ffmpeg_path.clone(),
            message: e.to_string(),
        })?;

        if !result.status.success() {
            return Err(OptimizeError::Process {
                status: result.status.to_string(),
                diagnostic: diagnostic(&result.stderr),
            });
        }

        let size = match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => {
                return Err(OptimizeError::Process {
                    status: result.status.to_string(),
                    diagnostic: "encoder produced no output".to_string(),
                });
            }
        };

        tracing::info!(
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video transcoded"
        );

        Ok(OptimizedArtifact {
            path: output.to_path_buf(),
            content_type: OPTIMIZED_VIDEO_CONTENT_TYPE.to_string(),
        })
    }
}
