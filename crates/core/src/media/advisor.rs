//! Decides whether a probed file satisfies a network's constraints and, when
//! it does not, computes the transcode plan that brings it into compliance.

use super::constraints::NetworkConstraint;
use super::types::{ConstraintViolation, Evaluation, MediaProbe, PlanStep, TranscodePlan};

/// Fraction of the size budget actually targeted, leaving headroom for
/// container overhead and encoder overshoot.
const SAFETY_MARGIN: f64 = 0.95;

/// Bitrate reserved for the audio track when splitting a total-bitrate budget.
const AUDIO_BITRATE_ALLOWANCE_KBPS: f64 = 128.0;

/// Video bitrate below this produces unwatchable output; the size check cannot
/// push below it.
const MIN_VIDEO_BITRATE_KBPS: u32 = 500;

/// Probed ratios within this distance of a supported ratio count as matching.
const RATIO_TOLERANCE: f64 = 0.01;

/// Stateless compatibility advisor. Evaluation is a pure function of the
/// probe and the constraint, so repeated calls yield identical results.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityAdvisor;

impl CompatibilityAdvisor {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates a probe against one network's constraints.
    ///
    /// Checks run in a fixed order: duration, size, aspect ratio. Each failed
    /// check records a violation; remediable ones also append a plan step.
    pub fn evaluate(&self, probe: &MediaProbe, constraint: &NetworkConstraint) -> Evaluation {
        let mut plan = TranscodePlan::new();
        let mut violations = Vec::new();

        // Duration after any trim, used below when budgeting bitrate for size.
        let mut effective_duration = probe.duration_secs;

        if let Some(max) = constraint.max_duration_secs {
            if probe.duration_secs > max {
                violations.push(ConstraintViolation::DurationExceeded {
                    actual_secs: probe.duration_secs,
                    max_secs: max,
                });
                plan.push(PlanStep::TrimDuration { max_secs: max });
                effective_duration = max;
            }
        }

        if let Some(min) = constraint.min_duration_secs {
            if probe.duration_secs < min {
                // No remedy: a too-short video cannot be padded into compliance.
                violations.push(ConstraintViolation::DurationTooShort {
                    actual_secs: probe.duration_secs,
                    min_secs: min,
                });
            }
        }

        if let Some(max_size_mb) = constraint.max_size_mb {
            let max_bytes = max_size_mb * 1024 * 1024;
            if probe.size_bytes > max_bytes {
                violations.push(ConstraintViolation::FileTooLarge {
                    size_bytes: probe.size_bytes,
                    max_bytes,
                });
                if effective_duration > 0.0 {
                    let bitrate = Self::size_budget_bitrate(max_size_mb, effective_duration);
                    plan.push(PlanStep::VideoBitrate {
                        bitrate_kbps: bitrate,
                        maxrate_kbps: bitrate,
                        bufsize_kbps: bitrate * 2,
                    });
                }
            }
        }

        if !constraint.supported_ratios.is_empty() {
            let ratio = probe.aspect_ratio();
            let matched = constraint
                .supported_ratios
                .iter()
                .any(|r| (r.value() - ratio).abs() <= RATIO_TOLERANCE);
            if !matched {
                // Closest supported ratio by absolute difference.
                let closest = constraint
                    .supported_ratios
                    .iter()
                    .min_by(|a, b| {
                        let da = (a.value() - ratio).abs();
                        let db = (b.value() - ratio).abs();
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .copied();
                if let Some(target) = closest {
                    violations.push(ConstraintViolation::RatioUnsupported {
                        actual: ratio,
                        closest: target.to_string(),
                        supported: constraint
                            .supported_ratios
                            .iter()
                            .map(|r| r.to_string())
                            .collect(),
                    });
                    let (width, height) =
                        Self::target_dimensions(constraint.preferred_width, target.value());
                    plan.push(PlanStep::ScalePad { width, height });
                }
            }
        }

        Evaluation {
            compliant: violations.is_empty(),
            plan,
            violations,
        }
    }

    /// Video bitrate in kbps that fits `max_size_mb` over `duration_secs`,
    /// after reserving the audio allowance. Never below the quality floor.
    fn size_budget_bitrate(max_size_mb: u64, duration_secs: f64) -> u32 {
        let total_kbps = (max_size_mb as f64 * 8.0 * 1024.0 * SAFETY_MARGIN) / duration_secs;
        let video_kbps = total_kbps - AUDIO_BITRATE_ALLOWANCE_KBPS;
        if video_kbps < MIN_VIDEO_BITRATE_KBPS as f64 {
            MIN_VIDEO_BITRATE_KBPS
        } else {
            video_kbps as u32
        }
    }

    /// Target frame for a re-encode toward `ratio`, derived from the
    /// network's preferred width along the long edge. Orientation is
    /// preserved: portrait targets set the height from the preferred width,
    /// landscape and square targets set the width.
    fn target_dimensions(preferred_width: u32, ratio: f64) -> (u32, u32) {
        let long_edge = round_even(preferred_width as f64);
        if ratio < 1.0 {
            let width = round_even(long_edge as f64 * ratio);
            (width, long_edge)
        } else {
            let height = round_even(long_edge as f64 / ratio);
            (long_edge, height)
        }
    }
}

/// Rounds to the nearest even integer. Codecs require even frame dimensions.
fn round_even(value: f64) -> u32 {
    ((value / 2.0).round() as u32) * 2
}
