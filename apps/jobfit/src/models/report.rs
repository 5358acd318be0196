use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical analysis result. Only the normalizer builds one; it is never
/// mutated afterwards and is shared as `Arc<MatchReport>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub overall_score: f64,            // 0 – 100
    pub skill_match_percent: f64,      // 0 – 100
    pub keyword_coverage_percent: f64, // 0 – 100
    pub semantic_similarity: f64,      // 0 – 10
    pub model_probability_score: f64,  // 0 – 10
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_years_estimate: f64,
    pub recommendations: Vec<String>,
    /// Free-text summary some service revisions send alongside the score.
    pub message: Option<String>,
}

/// Coarse reading of the overall score, as shown on the score gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBand {
    Strong,
    Moderate,
    Low,
}

impl MatchBand {
    pub fn from_score(score: f64) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 };
        if score >= 70.0 {
            MatchBand::Strong
        } else if score >= 40.0 {
            MatchBand::Moderate
        } else {
            MatchBand::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchBand::Strong => "Strong Match",
            MatchBand::Moderate => "Moderate Match",
            MatchBand::Low => "Low Match",
        }
    }
}

impl MatchReport {
    pub fn band(&self) -> MatchBand {
        MatchBand::from_score(self.overall_score)
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Overall score: {:.0}/100 ({})",
            self.overall_score,
            self.band().label()
        )?;
        if let Some(message) = &self.message {
            writeln!(f, "{message}")?;
        }
        writeln!(f, "Skill match: {:.0}%", self.skill_match_percent)?;
        writeln!(f, "Keyword coverage: {:.2}%", self.keyword_coverage_percent)?;
        writeln!(f, "Semantic similarity: {}/10", self.semantic_similarity)?;
        writeln!(f, "ATS probability: {}/10", self.model_probability_score)?;
        writeln!(f, "Matched skills: {}", join_or_none(&self.matched_skills))?;
        writeln!(f, "Missing skills: {}", join_or_none(&self.missing_skills))?;
        write!(
            f,
            "Experience estimate: {} years",
            self.experience_years_estimate
        )
    }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}
