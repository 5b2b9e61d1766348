use crate::domain::insight::InsightReport;

pub const SUMMARY_LABEL: &str = "Summary:";
pub const RECOMMENDATION_LABELS: [&str; 3] = [
    "Recommendation 1:",
    "Recommendation 2:",
    "Recommendation 3:",
];

/// Pulls the labeled lines out of the completion text. Matching is a literal
/// prefix check per line; a label that never matches leaves its field empty,
/// and a repeated label overwrites the earlier match. Unlabeled lines are
/// ignored.
pub fn parse_insights(text: &str) -> InsightReport {
    let mut summary = String::new();
    let mut recommendations: [String; 3] = Default::default();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(SUMMARY_LABEL) {
            summary = rest.trim().to_string();
            continue;
        }
        for (i, label) in RECOMMENDATION_LABELS.iter().enumerate() {
            if let Some(rest) = line.strip_prefix(label) {
                recommendations[i] = rest.trim().to_string();
                break;
            }
        }
    }

    InsightReport {
        summary,
        recommendations,
    }
}

/// Labels whose field came out empty, for the caller to log.
pub fn unfilled_labels(report: &InsightReport) -> Vec<&'static str> {
    let mut out = Vec::new();
    if report.summary.is_empty() {
        out.push(SUMMARY_LABEL);
    }
    for (label, rec) in RECOMMENDATION_LABELS.iter().zip(&report.recommendations) {
        if rec.is_empty() {
            out.push(*label);
        }
    }
    out
}
