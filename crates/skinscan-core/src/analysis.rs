//! Placeholder skin analysis.
//!
//! There is no real scoring model: [`MockSynthesizer`] draws plausible values
//! at random and derives recommendations from whatever it drew. It sits behind
//! [`ResultSynthesizer`] so a real backend can replace it without touching the
//! capture session.

use crate::synthesizer::{ResultSynthesizer, SynthesisError};
use crate::types::{
    AnalysisRecord, ArtifactRef, ConcernType, Recommendation,
    RecommendationType, Severity, SkinConcern, SkinType,
};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;
use std::time::Duration;

const OVERALL_SCORE_RANGE: Range<u32> = 65..95;
const SKIN_AGE_RANGE: Range<u32> = 22..45;
const HYDRATION_RANGE: Range<u32> = 60..95;
const ELASTICITY_RANGE: Range<u32> = 65..90;
/// Number of concerns reported per scan (2 or 3).
const CONCERN_COUNT_RANGE: Range<usize> = 2..4;

/// Default simulated processing time.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(2000);

struct ConcernTemplate {
    concern_type: ConcernType,
    severity: Severity,
    affected_area: &'static str,
    percentage: Range<u32>,
    description: &'static str,
}

static CONCERN_TEMPLATES: [ConcernTemplate; 5] = [
    ConcernTemplate {
        concern_type: ConcernType::Wrinkles,
        severity: Severity::Mild,
        affected_area: "Forehead and crow's feet",
        percentage: 10..25,
        description: "Fine lines are starting to appear, especially around the eyes and forehead.",
    },
    ConcernTemplate {
        concern_type: ConcernType::DarkSpots,
        severity: Severity::Moderate,
        affected_area: "Cheeks and temples",
        percentage: 15..30,
        description: "Sun-induced hyperpigmentation detected in exposed areas.",
    },
    ConcernTemplate {
        concern_type: ConcernType::Pores,
        severity: Severity::Mild,
        affected_area: "T-zone",
        percentage: 20..35,
        description: "Enlarged pores visible in the nose and forehead area.",
    },
    ConcernTemplate {
        concern_type: ConcernType::Dryness,
        severity: Severity::Moderate,
        affected_area: "Cheeks",
        percentage: 15..28,
        description: "Skin appears dehydrated with some flaking.",
    },
    ConcernTemplate {
        concern_type: ConcernType::Redness,
        severity: Severity::Mild,
        affected_area: "Nose and cheeks",
        percentage: 10..20,
        description: "Mild redness indicating possible sensitivity or irritation.",
    },
];

/// Randomised stand-in for a real analysis backend.
pub struct MockSynthesizer {
    rng: Mutex<StdRng>,
    processing_delay: Duration,
}

impl MockSynthesizer {
    pub fn new(processing_delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            processing_delay,
        }
    }

    /// Deterministic generator for tests and reproducible demos.
    pub fn seeded(seed: u64, processing_delay: Duration) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            processing_delay,
        }
    }

    fn generate(&self, artifacts: &[ArtifactRef]) -> AnalysisRecord {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let overall_score = rng.gen_range(OVERALL_SCORE_RANGE);
        let skin_age = rng.gen_range(SKIN_AGE_RANGE);
        let hydration = rng.gen_range(HYDRATION_RANGE);
        let elasticity = rng.gen_range(ELASTICITY_RANGE);
        let skin_type = *SkinType::ALL.choose(&mut *rng).unwrap_or(&SkinType::Normal);

        let concerns = generate_concerns(&mut *rng);
        let recommendations = recommendations_for(&concerns, skin_type);

        AnalysisRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            overall_score,
            skin_age,
            hydration,
            elasticity,
            skin_type,
            image_paths: artifacts.to_vec(),
            concerns,
            recommendations,
        }
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSING_DELAY)
    }
}

#[async_trait]
impl ResultSynthesizer for MockSynthesizer {
    async fn synthesize(&self, artifacts: &[ArtifactRef]) -> Result<AnalysisRecord, SynthesisError> {
        if artifacts.is_empty() {
            return Err(SynthesisError::NoArtifacts);
        }

        if !self.processing_delay.is_zero() {
            tokio::time::sleep(self.processing_delay).await;
        }

        let record = self.generate(artifacts);
        tracing::debug!(
            id = %record.id,
            score = record.overall_score,
            concerns = record.concerns.len(),
            "mock analysis generated"
        );
        Ok(record)
    }
}

fn generate_concerns<R: Rng + ?Sized>(rng: &mut R) -> Vec<SkinConcern> {
    let mut picks: Vec<&ConcernTemplate> = CONCERN_TEMPLATES.iter().collect();
    picks.shuffle(rng);
    let count = rng.gen_range(CONCERN_COUNT_RANGE);

    picks
        .into_iter()
        .take(count)
        .map(|t| SkinConcern {
            concern_type: t.concern_type,
            severity: t.severity,
            affected_area: t.affected_area.to_string(),
            percentage: rng.gen_range(t.percentage.clone()),
            description: t.description.to_string(),
        })
        .collect()
}

/// Concern types that carry a treatment, in the order treatments are listed.
const TREATMENT_ORDER: [ConcernType; 3] =
    [ConcernType::Wrinkles, ConcernType::DarkSpots, ConcernType::Pores];

/// Professional treatment suggested for a concern, if any.
pub fn treatment_for(concern: ConcernType) -> Option<Recommendation> {
    let (title, description) = match concern {
        ConcernType::Wrinkles => (
            "Anti-Aging Facial",
            "Professional treatment with retinol and peptides to reduce fine lines and improve skin texture.",
        ),
        ConcernType::DarkSpots => (
            "Brightening Treatment",
            "Chemical peel or laser therapy to reduce hyperpigmentation and even skin tone.",
        ),
        ConcernType::Pores => (
            "Deep Cleansing Facial",
            "Professional extraction and pore refining treatment to minimize pore appearance.",
        ),
        ConcernType::Acne
        | ConcernType::Redness
        | ConcernType::Dryness
        | ConcernType::Texture
        | ConcernType::Pigmentation
        | ConcernType::Scars => return None,
    };
    Some(Recommendation::new(RecommendationType::Treatment, title, description))
}

/// Daily-care product matched to a skin type. Normal skin gets none.
pub fn product_for(skin_type: SkinType) -> Option<Recommendation> {
    let (title, description) = match skin_type {
        SkinType::Dry => (
            "Hydrating Serum with Hyaluronic Acid",
            "Deeply moisturizes and plumps the skin, reducing the appearance of fine lines.",
        ),
        SkinType::Oily => (
            "Oil-Free Mattifying Moisturizer",
            "Lightweight formula that controls shine without clogging pores.",
        ),
        SkinType::Combination => (
            "Balancing Toner",
            "Helps regulate oil production while maintaining hydration balance.",
        ),
        SkinType::Sensitive => (
            "Gentle Calming Cream",
            "Fragrance-free formula with soothing ingredients to reduce redness and irritation.",
        ),
        SkinType::Normal => return None,
    };
    Some(Recommendation::new(RecommendationType::Product, title, description))
}

/// Build the recommendation list: treatments first, then products, then lifestyle.
pub fn recommendations_for(concerns: &[SkinConcern], skin_type: SkinType) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = TREATMENT_ORDER
        .iter()
        .filter(|t| concerns.iter().any(|c| c.concern_type == **t))
        .filter_map(|t| treatment_for(*t))
        .collect();

    recommendations.push(Recommendation::new(
        RecommendationType::Product,
        "Daily Sunscreen SPF 50+",
        "Essential protection against UV damage. Apply every morning and reapply throughout the day.",
    ));
    recommendations.extend(product_for(skin_type));

    recommendations.push(Recommendation::new(
        RecommendationType::Lifestyle,
        "Hydration & Sleep",
        "Drink 8 glasses of water daily and aim for 7-8 hours of quality sleep for optimal skin recovery.",
    ));
    recommendations.push(Recommendation::new(
        RecommendationType::Lifestyle,
        "Healthy Diet",
        "Include antioxidant-rich foods like berries, leafy greens, and omega-3 fatty acids for skin health.",
    ));

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs() -> Vec<ArtifactRef> {
        vec![
            ArtifactRef::new("front.jpg"),
            ArtifactRef::new("left.jpg"),
            ArtifactRef::new("right.jpg"),
        ]
    }

    #[tokio::test]
    async fn test_mock_values_in_range() {
        let synth = MockSynthesizer::seeded(7, Duration::ZERO);
        for _ in 0..50 {
            let record = synth.synthesize(&refs()).await.unwrap();
            assert!(OVERALL_SCORE_RANGE.contains(&record.overall_score));
            assert!(HYDRATION_RANGE.contains(&record.hydration));
            assert!(ELASTICITY_RANGE.contains(&record.elasticity));
            assert!(SKIN_AGE_RANGE.contains(&record.skin_age));
            assert!(CONCERN_COUNT_RANGE.contains(&record.concerns.len()));
        }
    }

    #[tokio::test]
    async fn test_mock_concerns_unique() {
        let synth = MockSynthesizer::seeded(11, Duration::ZERO);
        for _ in 0..20 {
            let record = synth.synthesize(&refs()).await.unwrap();
            let mut types: Vec<_> = record.concerns.iter().map(|c| c.concern_type).collect();
            let before = types.len();
            types.sort_by_key(|t| t.display_name());
            types.dedup();
            assert_eq!(types.len(), before, "concern drawn twice");
        }
    }

    #[tokio::test]
    async fn test_mock_keeps_artifact_order() {
        let synth = MockSynthesizer::seeded(1, Duration::ZERO);
        let record = synth.synthesize(&refs()).await.unwrap();
        assert_eq!(record.image_paths, refs());
    }

    #[tokio::test]
    async fn test_mock_seeded_is_deterministic() {
        let a = MockSynthesizer::seeded(42, Duration::ZERO);
        let b = MockSynthesizer::seeded(42, Duration::ZERO);
        let ra = a.synthesize(&refs()).await.unwrap();
        let rb = b.synthesize(&refs()).await.unwrap();
        assert_eq!(ra.overall_score, rb.overall_score);
        assert_eq!(ra.concerns, rb.concerns);
        assert_eq!(ra.skin_type, rb.skin_type);
        assert_ne!(ra.id, rb.id);
    }

    #[tokio::test]
    async fn test_mock_rejects_empty_artifacts() {
        let synth = MockSynthesizer::seeded(3, Duration::ZERO);
        let err = synth.synthesize(&[]).await.unwrap_err();
        assert!(matches!(err, SynthesisError::NoArtifacts));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_waits_processing_delay() {
        let synth = MockSynthesizer::seeded(3, Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        synth.synthesize(&refs()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_recommendations_follow_concerns() {
        let concerns = vec![SkinConcern {
            concern_type: ConcernType::Wrinkles,
            severity: Severity::Mild,
            affected_area: "Forehead".into(),
            percentage: 10,
            description: String::new(),
        }];
        let recs = recommendations_for(&concerns, SkinType::Dry);
        let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Anti-Aging Facial",
                "Daily Sunscreen SPF 50+",
                "Hydrating Serum with Hyaluronic Acid",
                "Hydration & Sleep",
                "Healthy Diet",
            ]
        );
    }

    #[test]
    fn test_normal_skin_without_treatable_concerns() {
        let concerns = vec![SkinConcern {
            concern_type: ConcernType::Redness,
            severity: Severity::Mild,
            affected_area: "Nose".into(),
            percentage: 12,
            description: String::new(),
        }];
        let recs = recommendations_for(&concerns, SkinType::Normal);
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.category != RecommendationType::Treatment));
    }

    fn concern(concern_type: ConcernType) -> SkinConcern {
        SkinConcern {
            concern_type,
            severity: Severity::Mild,
            affected_area: "Face".into(),
            percentage: 15,
            description: String::new(),
        }
    }

    #[test]
    fn test_treatments_in_fixed_order() {
        let concerns = vec![
            concern(ConcernType::Pores),
            concern(ConcernType::Dryness),
            concern(ConcernType::Wrinkles),
        ];
        let recs = recommendations_for(&concerns, SkinType::Normal);
        let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Anti-Aging Facial",
                "Deep Cleansing Facial",
                "Daily Sunscreen SPF 50+",
                "Hydration & Sleep",
                "Healthy Diet",
            ]
        );
    }

    #[test]
    fn test_repeated_concern_yields_one_treatment() {
        let concerns = vec![concern(ConcernType::DarkSpots), concern(ConcernType::DarkSpots)];
        let recs = recommendations_for(&concerns, SkinType::Normal);
        let treatments = recs
            .iter()
            .filter(|r| r.category == RecommendationType::Treatment)
            .count();
        assert_eq!(treatments, 1);
    }
}
