use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A required head pose. Declaration order is the default capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaptureAngle {
    Front,
    Left,
    Right,
}

impl CaptureAngle {
    /// Every angle, in default progression order.
    pub const ALL: [CaptureAngle; 3] = [CaptureAngle::Front, CaptureAngle::Left, CaptureAngle::Right];

    pub fn display_name(&self) -> &'static str {
        match self {
            CaptureAngle::Front => "Front",
            CaptureAngle::Left => "Left Profile",
            CaptureAngle::Right => "Right Profile",
        }
    }

    /// Prompt shown to the user while this angle is pending.
    pub fn instruction(&self) -> &'static str {
        match self {
            CaptureAngle::Front => "Face the camera directly",
            CaptureAngle::Left => "Turn your head 45° to the left",
            CaptureAngle::Right => "Turn your head 45° to the right",
        }
    }

    /// Lowercase token used in artifact file names.
    pub fn slug(&self) -> &'static str {
        match self {
            CaptureAngle::Front => "front",
            CaptureAngle::Left => "left",
            CaptureAngle::Right => "right",
        }
    }
}

impl fmt::Display for CaptureAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Opaque, stable handle to a saved capture image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConcernType {
    Wrinkles,
    DarkSpots,
    Acne,
    Redness,
    Dryness,
    Pores,
    Texture,
    Pigmentation,
    Scars,
}

impl ConcernType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConcernType::Wrinkles => "Wrinkles",
            ConcernType::DarkSpots => "Dark Spots",
            ConcernType::Acne => "Acne",
            ConcernType::Redness => "Redness",
            ConcernType::Dryness => "Dryness",
            ConcernType::Pores => "Enlarged Pores",
            ConcernType::Texture => "Uneven Texture",
            ConcernType::Pigmentation => "Pigmentation",
            ConcernType::Scars => "Scarring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Years added to the estimated skin age per concern of this severity.
    pub fn age_weight(&self) -> u32 {
        match self {
            Severity::Mild => 1,
            Severity::Moderate => 2,
            Severity::Severe => 3,
        }
    }
}

/// A single detected skin concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinConcern {
    #[serde(rename = "type")]
    pub concern_type: ConcernType,
    pub severity: Severity,
    pub affected_area: String,
    /// Share of the affected area showing the concern (0–100).
    pub percentage: u32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationType {
    Treatment,
    Product,
    Lifestyle,
}

impl RecommendationType {
    pub fn display_name(&self) -> &'static str {
        match self {
            RecommendationType::Treatment => "Treatment",
            RecommendationType::Product => "Product",
            RecommendationType::Lifestyle => "Lifestyle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: RecommendationType,
    pub title: String,
    pub description: String,
}

impl Recommendation {
    pub fn new(category: RecommendationType, title: &str, description: &str) -> Self {
        Self {
            category,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkinType {
    Normal,
    Oily,
    Dry,
    Combination,
    Sensitive,
}

impl SkinType {
    pub const ALL: [SkinType; 5] = [
        SkinType::Normal,
        SkinType::Oily,
        SkinType::Dry,
        SkinType::Combination,
        SkinType::Sensitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Normal => "Normal",
            SkinType::Oily => "Oily",
            SkinType::Dry => "Dry",
            SkinType::Combination => "Combination",
            SkinType::Sensitive => "Sensitive",
        }
    }
}

impl fmt::Display for SkinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown skin type: {0}")]
pub struct UnknownSkinType(pub String);

impl FromStr for SkinType {
    type Err = UnknownSkinType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkinType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSkinType(s.to_string()))
    }
}

/// Qualitative band for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn for_score(score: u32) -> Self {
        match score {
            80.. => ScoreBand::Good,
            60..=79 => ScoreBand::Fair,
            _ => ScoreBand::Poor,
        }
    }
}

/// A finished skin analysis, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: u32,
    pub skin_age: u32,
    pub hydration: u32,
    pub elasticity: u32,
    pub skin_type: SkinType,
    /// Captured images, in required-angle order.
    pub image_paths: Vec<ArtifactRef>,
    pub concerns: Vec<SkinConcern>,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisRecord {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::for_score(self.overall_score)
    }
}

const MIN_SKIN_AGE: u32 = 18;
const MAX_SKIN_AGE: u32 = 80;

/// Estimate apparent skin age: actual age plus one weight per concern, clamped to 18–80.
pub fn estimate_skin_age(actual_age: u32, concerns: &[SkinConcern]) -> u32 {
    let modifier: u32 = concerns.iter().map(|c| c.severity.age_weight()).sum();
    actual_age
        .saturating_add(modifier)
        .clamp(MIN_SKIN_AGE, MAX_SKIN_AGE)
}
