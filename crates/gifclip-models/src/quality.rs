//! Quality tiers and dithering modes.

use serde::{Deserialize, Serialize};

/// Rendition quality tier requested by the operator.
///
/// `Auto` picks a rendition based on the requested output width; the named
/// tiers index into the available renditions sorted by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Auto,
    Lowest,
    Low,
    Medium,
    High,
    Highest,
}

impl QualityTier {
    /// Position of this tier inside an ascending-by-width rendition list,
    /// as a fraction of the list length. `None` for `Auto`, which selects
    /// by target width instead.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            QualityTier::Auto => None,
            QualityTier::Lowest => Some(0.0),
            QualityTier::Low => Some(0.25),
            QualityTier::Medium => Some(0.5),
            QualityTier::High => Some(0.75),
            QualityTier::Highest => Some(1.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Auto => "auto",
            QualityTier::Lowest => "lowest",
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
            QualityTier::Highest => "highest",
        }
    }
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(QualityTier::Auto),
            "lowest" => Ok(QualityTier::Lowest),
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            "highest" => Ok(QualityTier::Highest),
            other => Err(format!(
                "unknown quality tier '{other}' (expected auto, lowest, low, medium, high or highest)"
            )),
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dithering mode applied by the lossy post-compression pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DitherMode {
    /// No dithering, hard color banding but smallest output.
    None,
    /// Error-diffusion dithering, best perceived quality.
    #[default]
    FloydSteinberg,
    /// Ordered-pattern dithering, compresses better than error diffusion.
    Ordered,
}

impl DitherMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DitherMode::None => "none",
            DitherMode::FloydSteinberg => "floyd-steinberg",
            DitherMode::Ordered => "ordered",
        }
    }
}

impl std::str::FromStr for DitherMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(DitherMode::None),
            "floyd-steinberg" | "fs" => Ok(DitherMode::FloydSteinberg),
            "ordered" => Ok(DitherMode::Ordered),
            other => Err(format!(
                "unknown dither mode '{other}' (expected none, floyd-steinberg or ordered)"
            )),
        }
    }
}

impl std::fmt::Display for DitherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tier_fractions() {
        assert_eq!(QualityTier::Auto.fraction(), None);
        assert_eq!(QualityTier::Lowest.fraction(), Some(0.0));
        assert_eq!(QualityTier::Medium.fraction(), Some(0.5));
        assert_eq!(QualityTier::Highest.fraction(), Some(1.0));
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!(QualityTier::from_str("medium").unwrap(), QualityTier::Medium);
        assert_eq!(QualityTier::from_str("HIGH").unwrap(), QualityTier::High);
        assert!(QualityTier::from_str("ultra").is_err());
    }

    #[test]
    fn test_tier_serde_roundtrip() {
        let json = serde_json::to_string(&QualityTier::Lowest).unwrap();
        assert_eq!(json, "\"lowest\"");
        let back: QualityTier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QualityTier::Lowest);
    }

    #[test]
    fn test_dither_from_str() {
        assert_eq!(DitherMode::from_str("fs").unwrap(), DitherMode::FloydSteinberg);
        assert_eq!(DitherMode::from_str("none").unwrap(), DitherMode::None);
        assert!(DitherMode::from_str("bayer").is_err());
    }
}
