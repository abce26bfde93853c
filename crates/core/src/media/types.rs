//! Types for media probing and transcode planning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Metadata probed from a media file. Produced fresh per preprocessing pass,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path the probe was taken from.
    pub path: PathBuf,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// File size in bytes.
    pub size_bytes: u64,
}

impl MediaProbe {
    /// Width over height. > 1 is landscape, < 1 is portrait.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// One directive in a transcode plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Cap output duration.
    TrimDuration { max_secs: f64 },
    /// Cap video bitrate to fit a size budget.
    VideoBitrate {
        bitrate_kbps: u32,
        maxrate_kbps: u32,
        bufsize_kbps: u32,
    },
    /// Scale into the target frame, letterbox-padding the remainder.
    ScalePad { width: u32, height: u32 },
}

impl PlanStep {
    /// Converts this step to ffmpeg arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        match self {
            Self::TrimDuration { max_secs } => {
                vec!["-t".to_string(), format!("{}", max_secs)]
            }
            Self::VideoBitrate {
                bitrate_kbps,
                maxrate_kbps,
                bufsize_kbps,
            } => vec![
                "-b:v".to_string(),
                format!("{}k", bitrate_kbps),
                "-maxrate".to_string(),
                format!("{}k", maxrate_kbps),
                "-bufsize".to_string(),
                format!("{}k", bufsize_kbps),
            ],
            Self::ScalePad { width, height } => vec![
                "-vf".to_string(),
                format!(
                    "scale={w}:{h}:force_original_aspect_ratio=decrease,\
                     pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
                    w = width,
                    h = height
                ),
            ],
        }
    }
}

/// An ordered list of transcode directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodePlan {
    pub steps: Vec<PlanStep>,
}

impl TranscodePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PlanStep) {
        self.steps.push(step);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Flattens all steps into ffmpeg arguments, in plan order.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.to_ffmpeg_args()).collect()
    }
}

/// A constraint the probed media fails to satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// Longer than the network allows; fixable by trimming.
    DurationExceeded { actual_secs: f64, max_secs: f64 },
    /// Shorter than the network allows; not fixable by transcoding.
    DurationTooShort { actual_secs: f64, min_secs: f64 },
    /// Larger than the network allows; fixable by lowering the bitrate.
    FileTooLarge { size_bytes: u64, max_bytes: u64 },
    /// Aspect ratio not within tolerance of any supported ratio; fixable by
    /// scale + pad toward the closest supported ratio.
    RatioUnsupported {
        actual: f64,
        closest: String,
        supported: Vec<String>,
    },
}

impl ConstraintViolation {
    /// The stable error code surfaced when this violation cannot be remedied.
    pub fn error_code(&self) -> crate::job::ErrorCode {
        match self {
            Self::DurationExceeded { .. } | Self::DurationTooShort { .. } => {
                crate::job::ErrorCode::UnsupportedDuration
            }
            Self::FileTooLarge { .. } => crate::job::ErrorCode::FileTooLarge,
            Self::RatioUnsupported { .. } => crate::job::ErrorCode::UnsupportedRatio,
        }
    }
}

/// Result of evaluating a probe against one network's constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Whether the file is acceptable as-is.
    pub compliant: bool,
    /// Remediation plan; empty when compliant or when no remedy exists.
    pub plan: TranscodePlan,
    /// Every constraint the probe failed, in check order.
    pub violations: Vec<ConstraintViolation>,
}

impl Evaluation {
    pub fn compliant() -> Self {
        Self {
            compliant: true,
            plan: TranscodePlan::new(),
            violations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let probe = MediaProbe {
            path: PathBuf::from("/a.mp4"),
            width: 1920,
            height: 1080,
            duration_secs: 60.0,
            size_bytes: 1024,
        };
        assert!((probe.aspect_ratio() - 16.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_ratio_zero_height() {
        let probe = MediaProbe {
            path: PathBuf::from("/a.mp4"),
            width: 1920,
            height: 0,
            duration_secs: 60.0,
            size_bytes: 1024,
        };
        assert_eq!(probe.aspect_ratio(), 0.0);
    }

    #[test]
    fn test_trim_step_args() {
        let args = PlanStep::TrimDuration { max_secs: 60.0 }.to_ffmpeg_args();
        assert_eq!(args, vec!["-t", "60"]);
    }

    #[test]
    fn test_bitrate_step_args() {
        let args = PlanStep::VideoBitrate {
            bitrate_kbps: 4000,
            maxrate_kbps: 4000,
            bufsize_kbps: 8000,
        }
        .to_ffmpeg_args();
        assert_eq!(
            args,
            vec!["-b:v", "4000k", "-maxrate", "4000k", "-bufsize", "8000k"]
        );
    }

    #[test]
    fn test_scale_pad_step_args() {
        let args = PlanStep::ScalePad {
            width: 1080,
            height: 1920,
        }
        .to_ffmpeg_args();
        assert_eq!(args[0], "-vf");
        assert!(args[1].contains("scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(args[1].contains("pad=1080:1920:(ow-iw)/2:(oh-ih)/2:black"));
    }

    #[test]
    fn test_plan_flattens_in_order() {
        let mut plan = TranscodePlan::new();
        plan.push(PlanStep::TrimDuration { max_secs: 30.0 });
        plan.push(PlanStep::VideoBitrate {
            bitrate_kbps: 2000,
            maxrate_kbps: 2000,
            bufsize_kbps: 4000,
        });
        let args = plan.to_ffmpeg_args();
        assert_eq!(args[0], "-t");
        assert_eq!(args[2], "-b:v");
    }
}
