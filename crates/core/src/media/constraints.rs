//! Per-network publishing constraints.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An aspect ratio expressed as `width:height`, e.g. `16:9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub w: u32,
    pub h: u32,
}

impl AspectRatio {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Numeric width-over-height value.
    pub fn value(&self) -> f64 {
        if self.h == 0 {
            return 0.0;
        }
        self.w as f64 / self.h as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.w, self.h)
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid aspect ratio '{}': expected W:H", s))?;
        let w: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid aspect ratio width in '{}'", s))?;
        let h: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid aspect ratio height in '{}'", s))?;
        if w == 0 || h == 0 {
            return Err(format!("aspect ratio '{}' must have nonzero terms", s));
        }
        Ok(Self { w, h })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(r: AspectRatio) -> Self {
        r.to_string()
    }
}

/// Static constraints one network imposes on uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConstraint {
    /// Maximum duration; longer videos are trimmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<f64>,
    /// Minimum duration; shorter videos are rejected (no remedy exists).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration_secs: Option<f64>,
    /// Maximum file size; larger videos are re-encoded at a lower bitrate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_mb: Option<u64>,
    /// Acceptable aspect ratios. Empty means any ratio is acceptable.
    #[serde(default)]
    pub supported_ratios: Vec<AspectRatio>,
    /// Long-edge width used when re-encoding toward a supported ratio.
    pub preferred_width: u32,
}

/// Lookup table of network id → constraints. A network with no entry has no
/// constraints (absence is not an error).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintTable {
    networks: HashMap<String, NetworkConstraint>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, network: impl Into<String>, constraint: NetworkConstraint) {
        self.networks.insert(network.into(), constraint);
    }

    pub fn get(&self, network: &str) -> Option<&NetworkConstraint> {
        self.networks.get(network)
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NetworkConstraint)> {
        self.networks.iter()
    }

    /// Built-in defaults for the commonly targeted networks. Used when the
    /// configuration does not supply a table of its own.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "youtube",
            NetworkConstraint {
                max_duration_secs: Some(12.0 * 3600.0),
                min_duration_secs: None,
                max_size_mb: Some(128 * 1024),
                supported_ratios: vec![AspectRatio::new(16, 9), AspectRatio::new(9, 16)],
                preferred_width: 1920,
            },
        );
        table.insert(
            "tiktok",
            NetworkConstraint {
                max_duration_secs: Some(600.0),
                min_duration_secs: Some(3.0),
                max_size_mb: Some(287),
                supported_ratios: vec![AspectRatio::new(9, 16)],
                preferred_width: 1080,
            },
        );
        table.insert(
            "instagram",
            NetworkConstraint {
                max_duration_secs: Some(90.0),
                min_duration_secs: Some(3.0),
                max_size_mb: Some(650),
                supported_ratios: vec![AspectRatio::new(9, 16), AspectRatio::new(1, 1)],
                preferred_width: 1080,
            },
        );
        table.insert(
            "x",
            NetworkConstraint {
                max_duration_secs: Some(140.0),
                min_duration_secs: None,
                max_size_mb: Some(512),
                supported_ratios: vec![
                    AspectRatio::new(16, 9),
                    AspectRatio::new(1, 1),
                    AspectRatio::new(9, 16),
                ],
                preferred_width: 1280,
            },
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_parse_and_display() {
        let r: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(r, AspectRatio::new(16, 9));
        assert_eq!(r.to_string(), "16:9");
        assert!((r.value() - 1.7777).abs() < 0.001);
    }

    #[test]
    fn test_ratio_parse_rejects_garbage() {
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
        assert!("a:b".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn test_ratio_serde_as_string() {
        let json = serde_json::to_string(&AspectRatio::new(9, 16)).unwrap();
        assert_eq!(json, "\"9:16\"");
        let parsed: AspectRatio = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AspectRatio::new(9, 16));
    }

    #[test]
    fn test_table_lookup() {
        let table = ConstraintTable::builtin();
        assert!(table.get("tiktok").is_some());
        assert!(table.get("myspace").is_none());
    }

    #[test]
    fn test_table_from_toml() {
        let toml = r#"
            [vimeo]
            max_duration_secs = 3600.0
            max_size_mb = 500
            supported_ratios = ["16:9"]
            preferred_width = 1920
        "#;
        let table: ConstraintTable = toml::from_str(toml).unwrap();
        let vimeo = table.get("vimeo").unwrap();
        assert_eq!(vimeo.max_size_mb, Some(500));
        assert_eq!(vimeo.supported_ratios, vec![AspectRatio::new(16, 9)]);
    }
}
