use std::fmt::Write;

use chrono::NaiveDate;

use crate::classify::classify;
use crate::models::{AdmissionScore, CatalogEntry, MatchResult, StudentRecord, WeightConfig};

const MAX_LISTED_PROGRAMS: usize = 20;

/// Matched entries ordered for display: recorded thresholds first, hardest
/// program on top, unknown thresholds at the end.
pub fn ranked_entries(result: &MatchResult) -> Vec<&CatalogEntry> {
    let mut entries: Vec<&CatalogEntry> = result.matched_entries.iter().collect();
    entries.sort_by(|a, b| {
        let a_known = a.required_grade > 0.0;
        let b_known = b.required_grade > 0.0;
        b_known.cmp(&a_known).then(
            b.required_grade
                .partial_cmp(&a.required_grade)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
    entries
}

pub fn build_report(
    student: &StudentRecord,
    query: &str,
    score: AdmissionScore,
    weights: &WeightConfig,
    result: &MatchResult,
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Admission Planning Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        student.full_name, student.email, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Admission Average");
    let _ = writeln!(
        output,
        "- {:.2}/200 ({:.2}/20) on the {} track, {} year",
        score.on_two_hundred(),
        score.on_twenty(),
        student.track,
        student.current_year
    );
    let _ = writeln!(
        output,
        "- Weights applied: secondary {:.0}%, exams {:.0}%",
        weights.secondary_weight * 100.0,
        weights.exam_weight * 100.0
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Programs matching \"{query}\"");

    if result.is_empty() {
        let _ = writeln!(output, "No programs found for this search.");
    } else {
        for entry in ranked_entries(result).iter().take(MAX_LISTED_PROGRAMS) {
            if entry.required_grade > 0.0 {
                let verdict = classify(score.on_twenty(), entry.required_grade / 10.0);
                let _ = writeln!(
                    output,
                    "- {} — {} ({}, {}): last admitted {:.1}/200 [{}, margin {:+.2}]",
                    entry.program_name,
                    entry.institution_name,
                    entry.region,
                    entry.cycle_year,
                    entry.required_grade,
                    verdict.tier,
                    verdict.margin
                );
            } else {
                let _ = writeln!(
                    output,
                    "- {} — {} ({}, {}): no recorded threshold",
                    entry.program_name, entry.institution_name, entry.region, entry.cycle_year
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Threshold Summary");

    match result.stats {
        Some(stats) => {
            let _ = writeln!(
                output,
                "- Required grades across {} offering(s): min {:.1}, max {:.1}, avg {:.1}",
                stats.sample_size, stats.min_required, stats.max_required, stats.avg_required
            );
            let verdict = classify(score.on_twenty(), stats.avg_required / 10.0);
            let _ = writeln!(
                output,
                "- Against the average threshold this profile is a {} ({:+.2} on the 0-20 scale)",
                verdict.tier, verdict.margin
            );
        }
        None => {
            let _ = writeln!(
                output,
                "No recorded thresholds among the matched programs."
            );
        }
    }

    output
}
