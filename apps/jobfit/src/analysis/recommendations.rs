use crate::models::MatchReport;

/// Marker phrase of the service's own skill-gap advice. Dropped in favour of
/// the client-side line so the gap is listed once.
const SKILL_GAP_MARKER: &str = "consider adding the following skills";

/// Recommendations in display order: the skill-gap line first (when there are
/// missing skills), then the service's advice minus its own skill-gap entry.
pub fn display_recommendations(report: &MatchReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.recommendations.len() + 1);

    if !report.missing_skills.is_empty() {
        lines.push(format!(
            "Consider adding the following skills to your resume if you have hands-on experience: {}.",
            report.missing_skills.join(", ")
        ));
    }

    lines.extend(
        report
            .recommendations
            .iter()
            .filter(|r| !r.to_lowercase().contains(SKILL_GAP_MARKER))
            .cloned(),
    );

    lines
}
