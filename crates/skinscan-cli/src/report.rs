//! Human-readable and JSON rendering of scan records.

use anyhow::Result;
use skinscan_core::{AnalysisRecord, ScoreBand, Severity};
use std::fmt::Write as _;

pub fn band_label(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::Good => "good",
        ScoreBand::Fair => "fair",
        ScoreBand::Poor => "needs attention",
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Mild => "mild",
        Severity::Moderate => "moderate",
        Severity::Severe => "severe",
    }
}

/// One line per record, as printed by `skinscan list`.
pub fn summary_line(record: &AnalysisRecord) -> String {
    format!(
        "{}  {}  score {:>3} ({})  skin age {}  {}",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.overall_score,
        band_label(record.score_band()),
        record.skin_age,
        record.skin_type,
    )
}

/// Full breakdown of one record.
pub fn detail(record: &AnalysisRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scan {}", record.id);
    let _ = writeln!(out, "  Taken:       {}", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(
        out,
        "  Score:       {} ({})",
        record.overall_score,
        band_label(record.score_band())
    );
    let _ = writeln!(out, "  Skin age:    {}", record.skin_age);
    let _ = writeln!(out, "  Hydration:   {}%", record.hydration);
    let _ = writeln!(out, "  Elasticity:  {}%", record.elasticity);
    let _ = writeln!(out, "  Skin type:   {}", record.skin_type);

    let _ = writeln!(out, "\nConcerns:");
    if record.concerns.is_empty() {
        let _ = writeln!(out, "  none detected");
    }
    for concern in &record.concerns {
        let _ = writeln!(
            out,
            "  - {} ({}, {}, {}%): {}",
            concern.concern_type.display_name(),
            severity_label(concern.severity),
            concern.affected_area,
            concern.percentage,
            concern.description
        );
    }

    let _ = writeln!(out, "\nRecommendations:");
    for rec in &record.recommendations {
        let _ = writeln!(
            out,
            "  [{}] {}: {}",
            rec.category.display_name(),
            rec.title,
            rec.description
        );
    }

    let _ = writeln!(out, "\nImages:");
    for artifact in &record.image_paths {
        let _ = writeln!(out, "  {artifact}");
    }
    out
}

pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
