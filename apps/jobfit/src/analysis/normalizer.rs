//! Response Normalizer: turns whatever the scoring service returned into one
//! canonical `MatchReport`.
//!
//! The service has shipped several response shapes over time:
//! - a rich breakdown (`final_score` plus a nested `score_breakdown`),
//! - a flat `{ match_score, message }` pair,
//! - either of the above with fields missing.
//!
//! Each report field is looked up in a fixed list of known locations and
//! coerced to a default when absent. The only hard failure is a payload that
//! is not a JSON object at all.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::models::MatchReport;

/// Upstream convention for the overall score. The report always stores 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Service sends 0–10 (model probability × 10).
    #[default]
    TenPoint,
    /// Service already sends 0–100.
    Percent,
}

impl ScoreScale {
    fn to_percent(self, raw: f64) -> f64 {
        let scaled = match self {
            ScoreScale::TenPoint => raw * 10.0,
            ScoreScale::Percent => raw,
        };
        scaled.clamp(0.0, 100.0)
    }
}

impl FromStr for ScoreScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ten_point" | "10" | "0-10" => Ok(ScoreScale::TenPoint),
            "percent" | "100" | "0-100" => Ok(ScoreScale::Percent),
            other => Err(format!("unknown score scale '{other}'")),
        }
    }
}

const BREAKDOWN: &str = "score_breakdown";

// Ordered lookup paths per field. First present value wins.
const OVERALL_PATHS: &[&[&str]] = &[&["final_score"], &["match_score"]];
const SKILL_MATCH_PATHS: &[&[&str]] = &[&[BREAKDOWN, "skill_match_percent"], &["skill_match_percent"]];
const KEYWORD_PATHS: &[&[&str]] = &[
    &[BREAKDOWN, "keyword_coverage_percent"],
    &["keyword_coverage_percent"],
];
const SEMANTIC_PATHS: &[&[&str]] = &[&[BREAKDOWN, "semantic_similarity"], &["semantic_similarity"]];
const PROBABILITY_PATHS: &[&[&str]] = &[
    &[BREAKDOWN, "model_probability_score"],
    &["model_probability_score"],
];
const EXPERIENCE_PATHS: &[&[&str]] = &[&["years_experience_estimate"], &["experience_years_estimate"]];

/// Builds a `MatchReport` from a raw analyze payload.
///
/// Total over JSON objects, `{}` included: every missing or unreadable field
/// falls back to 0 / empty. Fails with `MalformedPayload` only when the
/// payload itself is not an object.
pub fn normalize(payload: &Value, scale: ScoreScale) -> Result<MatchReport, AppError> {
    let root = payload.as_object().ok_or_else(|| {
        AppError::MalformedPayload(format!("expected a JSON object, got {}", kind_of(payload)))
    })?;

    Ok(MatchReport {
        overall_score: scale.to_percent(number_at(root, OVERALL_PATHS)),
        skill_match_percent: number_at(root, SKILL_MATCH_PATHS),
        keyword_coverage_percent: number_at(root, KEYWORD_PATHS),
        semantic_similarity: number_at(root, SEMANTIC_PATHS),
        model_probability_score: number_at(root, PROBABILITY_PATHS),
        matched_skills: strings_at(root, "matched_skills"),
        missing_skills: strings_at(root, "missing_skills"),
        experience_years_estimate: number_at(root, EXPERIENCE_PATHS),
        recommendations: strings_at(root, "recommendations"),
        message: root
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
    })
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(root.get(*first)?, |value, key| value.as_object()?.get(*key))
        .filter(|v| !v.is_null())
}

fn number_at(root: &Map<String, Value>, paths: &[&[&str]]) -> f64 {
    paths
        .iter()
        .find_map(|path| lookup(root, path))
        .map(coerce_number)
        .unwrap_or(0.0)
}

/// Numbers pass through, numeric strings are parsed, everything else is 0.
fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Keeps upstream order and duplicates. Scalars are stringified, nested
/// values and nulls dropped; a non-array yields an empty list.
fn strings_at(root: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = root.get(key) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
