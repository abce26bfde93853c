//! FFmpeg-backed transcoder implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::TranscoderConfig;
use super::error::MediaError;
use super::traits::Transcoder;
use super::types::{MediaProbe, TranscodePlan};

/// FFmpeg-backed transcoder.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds the ffmpeg argument list for a transcode plan.
    fn build_args(&self, input: &Path, output: &Path, plan: &TranscodePlan) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
        ];

        args.extend(plan.to_ffmpeg_args());

        // Plans carry filter/bitrate/trim directives only; re-encode with a
        // codec every target network accepts.
        args.extend([
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args.extend([
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(output.to_string_lossy().to_string());
        args
    }

    /// Parses ffprobe JSON output into a probe result.
    fn parse_probe_output(path: &Path, output: &str) -> Result<MediaProbe, MediaError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
            size: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            width: Option<u32>,
            height: Option<u32>,
        }

        let probe: ProbeOutput =
            serde_json::from_str(output).map_err(|e| MediaError::ParseError {
                reason: format!("failed to parse ffprobe output: {}", e),
            })?;

        let video = probe
            .streams
            .iter()
            .find(|s| s.codec_type == "video")
            .ok_or_else(|| MediaError::NoVideoStream {
                path: path.to_path_buf(),
            })?;

        let (width, height) = match (video.width, video.height) {
            (Some(w), Some(h)) => (w, h),
            _ => {
                return Err(MediaError::ParseError {
                    reason: "video stream missing dimensions".to_string(),
                })
            }
        };

        let duration_secs = probe
            .format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let size_bytes = probe
            .format
            .size
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(MediaProbe {
            path: path.to_path_buf(),
            width,
            height,
            duration_secs,
            size_bytes,
        })
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<MediaProbe, MediaError> {
        if !path.exists() {
            return Err(MediaError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(MediaError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(path, &stdout)
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        plan: &TranscodePlan,
    ) -> Result<PathBuf, MediaError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(input, output, plan);

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, child.wait_with_output()).await;

        let process_output = match result {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => return Err(MediaError::Io(e)),
            Err(_) => {
                // wait_with_output consumed the child; the process is reaped
                // with it when the future is dropped on timeout.
                return Err(MediaError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !process_output.status.success() {
            let stderr = String::from_utf8_lossy(&process_output.stderr).to_string();
            return Err(MediaError::transcode_failed(
                format!("ffmpeg exited with code: {:?}", process_output.status.code()),
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr)
                },
            ));
        }

        // Output must exist even on a zero exit.
        tokio::fs::metadata(output)
            .await
            .map_err(|_| MediaError::transcode_failed("output file not created", None))?;

        Ok(output.to_path_buf())
    }

    async fn validate(&self) -> Result<(), MediaError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(MediaError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(MediaError::Io(e));
        }

        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(MediaError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(MediaError::Io(e));
        }

        Ok(())
    }
}
