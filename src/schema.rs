//! Coaching Result Schema
//!
//! Typed schema for the model's structured output plus the strict parser
//! that turns raw response text into a `CoachingResult`. The parser is the
//! integrity boundary against an unreliable generative backend: the fixed
//! schema is never partial.
//!
//! Parse policy (applied uniformly):
//! - a missing, `null` or blank string field becomes the literal fallback
//!   phrase `insufficient information to analyze`;
//! - a body that is not JSON, a string field of the wrong type, or a
//!   missing/empty/duplicate-style `recommended_actions` array is an
//!   `InvalidOutput` error carrying a diagnostic excerpt of the raw text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AnalysisStyle;
use crate::error::CoachError;

/// Literal value substituted for any field the model could not ground in
/// the transcript.
pub const FALLBACK_PHRASE: &str = "insufficient information to analyze";

/// Maximum number of raw-response characters carried in a parse error.
const RAW_EXCERPT_CHARS: usize = 500;

/// One coaching move: a labeled style plus the suggested script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    /// Coaching-move category label. Distinct across the result's actions.
    pub style: String,
    /// The suggested wording, 3-5 lines of concrete phrasing.
    pub script: String,
}

/// Objection-handling analysis block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectionHandling {
    /// The customer's predicted next objection or hesitation.
    pub predicted_objection: String,
    /// Strategy for countering the predicted objection.
    pub counter_strategy: String,
    /// A ready-to-use script executing the counter strategy.
    pub example_script: String,
}

/// Three-stage coverage review analysis block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReview {
    /// Stage one: assessment of the customer's current coverage.
    pub current_coverage: String,
    /// Stage two: the gaps that assessment exposes.
    pub coverage_gaps: String,
    /// Stage three: the coverage the agent should propose.
    pub recommended_coverage: String,
}

/// Deployment-variable analysis sub-object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisBlock {
    ObjectionHandling(ObjectionHandling),
    CoverageReview(CoverageReview),
}

/// The parsed coaching result. Every field is always present; fields the
/// model could not ground carry `FALLBACK_PHRASE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingResult {
    pub customer_intent: String,
    pub customer_sentiment: String,
    pub customer_profile_guess: String,
    pub analysis: AnalysisBlock,
    pub recommended_actions: Vec<RecommendedAction>,
    pub next_step_strategy: String,
}

/// JSON key the parser expects for the given deployment style.
pub(crate) fn analysis_key(style: AnalysisStyle) -> &'static str {
    match style {
        AnalysisStyle::ObjectionHandling => "objection_handling_strategy",
        AnalysisStyle::CoverageReview => "coverage_analysis",
    }
}

/// Head of the raw response for diagnostics, capped at `RAW_EXCERPT_CHARS`.
pub(crate) fn raw_excerpt(raw: &str) -> String {
    raw.chars().take(RAW_EXCERPT_CHARS).collect()
}

/// Parse raw model output into a `CoachingResult`.
pub fn parse_coaching_result(
    raw: &str,
    style: AnalysisStyle,
) -> Result<CoachingResult, CoachError> {
    let body = extract_json_body(raw);
    let value: Value = serde_json::from_str(&body).map_err(|e| invalid(raw, format!("not valid JSON: {}", e)))?;

    let obj = value
        .as_object()
        .ok_or_else(|| invalid(raw, "top-level value is not a JSON object"))?;

    let customer_intent = string_field(obj, "customer_intent").map_err(|d| invalid(raw, d))?;
    let customer_sentiment =
        string_field(obj, "customer_sentiment").map_err(|d| invalid(raw, d))?;
    let customer_profile_guess =
        string_field(obj, "customer_profile_guess").map_err(|d| invalid(raw, d))?;
    let next_step_strategy =
        string_field(obj, "next_step_strategy").map_err(|d| invalid(raw, d))?;

    let analysis = parse_analysis_block(obj, style).map_err(|d| invalid(raw, d))?;
    let recommended_actions = parse_actions(obj).map_err(|d| invalid(raw, d))?;

    Ok(CoachingResult {
        customer_intent,
        customer_sentiment,
        customer_profile_guess,
        analysis,
        recommended_actions,
        next_step_strategy,
    })
}

fn invalid(raw: &str, detail: impl Into<String>) -> CoachError {
    CoachError::InvalidOutput {
        detail: detail.into(),
        raw_excerpt: raw_excerpt(raw),
    }
}

/// Strip markdown code fences some backends wrap their JSON in, otherwise
/// narrow to the outermost object braces.
fn extract_json_body(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip the optional language identifier (e.g. "json").
        let content_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            return content[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start <= end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

/// Read a string-valued field with the fallback policy.
fn string_field(obj: &serde_json::Map<String, Value>, name: &str) -> Result<String, String> {
    match obj.get(name) {
        None | Some(Value::Null) => Ok(FALLBACK_PHRASE.to_string()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(FALLBACK_PHRASE.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!(
            "field '{}' should be a string, got {}",
            name,
            type_name(other)
        )),
    }
}

fn parse_analysis_block(
    obj: &serde_json::Map<String, Value>,
    style: AnalysisStyle,
) -> Result<AnalysisBlock, String> {
    let key = analysis_key(style);
    let empty = serde_json::Map::new();
    let inner = match obj.get(key) {
        // An entirely absent block degrades to fallback leaves, same as a
        // missing string field.
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(format!(
                "field '{}' should be an object, got {}",
                key,
                type_name(other)
            ))
        }
    };

    match style {
        AnalysisStyle::ObjectionHandling => Ok(AnalysisBlock::ObjectionHandling(ObjectionHandling {
            predicted_objection: string_field(inner, "predicted_objection")?,
            counter_strategy: string_field(inner, "counter_strategy")?,
            example_script: string_field(inner, "example_script")?,
        })),
        AnalysisStyle::CoverageReview => Ok(AnalysisBlock::CoverageReview(CoverageReview {
            current_coverage: string_field(inner, "current_coverage")?,
            coverage_gaps: string_field(inner, "coverage_gaps")?,
            recommended_coverage: string_field(inner, "recommended_coverage")?,
        })),
    }
}

/// Parse `recommended_actions` strictly: the actions are the product's
/// payload, so a missing, empty or malformed list is a parse failure rather
/// than a fallback.
fn parse_actions(obj: &serde_json::Map<String, Value>) -> Result<Vec<RecommendedAction>, String> {
    let items = match obj.get("recommended_actions") {
        None | Some(Value::Null) => return Err("'recommended_actions' is missing".to_string()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(format!(
                "'recommended_actions' should be an array, got {}",
                type_name(other)
            ))
        }
    };

    if items.is_empty() {
        return Err("'recommended_actions' is empty".to_string());
    }

    let mut actions = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let entry = item
            .as_object()
            .ok_or_else(|| format!("recommended_actions[{}] is not an object", i))?;
        let style = required_string(entry, "style", i)?;
        let script = required_string(entry, "script", i)?;
        actions.push(RecommendedAction { style, script });
    }

    // Every style must be pairwise distinct.
    for (i, a) in actions.iter().enumerate() {
        if actions[..i].iter().any(|b| b.style == a.style) {
            return Err(format!("duplicate action style '{}'", a.style));
        }
    }

    Ok(actions)
}

fn required_string(
    entry: &serde_json::Map<String, Value>,
    name: &str,
    index: usize,
) -> Result<String, String> {
    match entry.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(format!(
            "recommended_actions[{}] is missing a non-empty '{}'",
            index, name
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> String {
        serde_json::json!({
            "customer_intent": "wants to understand premium cost",
            "customer_sentiment": "cautious",
            "customer_profile_guess": "analytical",
            "objection_handling_strategy": {
                "predicted_objection": "the premium feels too high",
                "counter_strategy": "reframe around daily cost and coverage value",
                "example_script": "Many customers feel the same at first.\nLet's look at what it covers.\nPer day it is less than a coffee."
            },
            "recommended_actions": [
                {"style": "empathy and rapport", "script": "I completely understand.\nCost matters.\nLet's walk through it together."},
                {"style": "information and persuasion", "script": "Generally, plans like this cover X.\nFor example, hospitalization.\nThat is the core value."},
                {"style": "next step question", "script": "Would it help to compare two options?\nI can prepare both.\nWhich day suits you?"}
            ],
            "next_step_strategy": "offer a narrowed two-option comparison"
        })
        .to_string()
    }

    // =====================================================================
    // Successful parse
    // =====================================================================

    #[test]
    fn parses_complete_objection_handling_result() {
        let result =
            parse_coaching_result(&valid_json(), AnalysisStyle::ObjectionHandling).unwrap();
        assert_eq!(result.customer_intent, "wants to understand premium cost");
        assert_eq!(result.customer_sentiment, "cautious");
        assert_eq!(result.recommended_actions.len(), 3);
        match &result.analysis {
            AnalysisBlock::ObjectionHandling(block) => {
                assert_eq!(block.predicted_objection, "the premium feels too high");
            }
            other => panic!("unexpected analysis block: {:?}", other),
        }
    }

    #[test]
    fn parses_coverage_review_result() {
        let raw = serde_json::json!({
            "customer_intent": "coverage check",
            "customer_sentiment": "curious",
            "customer_profile_guess": "relationship-driven",
            "coverage_analysis": {
                "current_coverage": "basic life policy only",
                "coverage_gaps": "no critical illness rider",
                "recommended_coverage": "add critical illness and hospitalization"
            },
            "recommended_actions": [
                {"style": "empathy and rapport", "script": "a\nb\nc"},
                {"style": "information and persuasion", "script": "d\ne\nf"}
            ],
            "next_step_strategy": "book a coverage review call"
        })
        .to_string();

        let result = parse_coaching_result(&raw, AnalysisStyle::CoverageReview).unwrap();
        match &result.analysis {
            AnalysisBlock::CoverageReview(block) => {
                assert_eq!(block.coverage_gaps, "no critical illness rider");
            }
            other => panic!("unexpected analysis block: {:?}", other),
        }
    }

    #[test]
    fn tolerates_markdown_fenced_json() {
        let fenced = format!("```json\n{}\n```", valid_json());
        let result =
            parse_coaching_result(&fenced, AnalysisStyle::ObjectionHandling).unwrap();
        assert_eq!(result.customer_sentiment, "cautious");
    }

    #[test]
    fn tolerates_prose_around_object() {
        let wrapped = format!("Here is the analysis:\n{}\nHope this helps.", valid_json());
        assert!(parse_coaching_result(&wrapped, AnalysisStyle::ObjectionHandling).is_ok());
    }

    // =====================================================================
    // Fallback policy
    // =====================================================================

    #[test]
    fn missing_string_field_gets_fallback() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value.as_object_mut().unwrap().remove("customer_sentiment");
        let result = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap();
        assert_eq!(result.customer_sentiment, FALLBACK_PHRASE);
    }

    #[test]
    fn null_string_field_gets_fallback() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["next_step_strategy"] = Value::Null;
        let result = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap();
        assert_eq!(result.next_step_strategy, FALLBACK_PHRASE);
    }

    #[test]
    fn blank_string_field_gets_fallback() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["customer_profile_guess"] = Value::String("   ".to_string());
        let result = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap();
        assert_eq!(result.customer_profile_guess, FALLBACK_PHRASE);
    }

    #[test]
    fn missing_analysis_block_degrades_to_fallback_leaves() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .remove("objection_handling_strategy");
        let result = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap();
        match &result.analysis {
            AnalysisBlock::ObjectionHandling(block) => {
                assert_eq!(block.predicted_objection, FALLBACK_PHRASE);
                assert_eq!(block.counter_strategy, FALLBACK_PHRASE);
                assert_eq!(block.example_script, FALLBACK_PHRASE);
            }
            other => panic!("unexpected analysis block: {:?}", other),
        }
    }

    // =====================================================================
    // Hard parse failures
    // =====================================================================

    #[test]
    fn non_json_body_is_parse_error() {
        let err =
            parse_coaching_result("I cannot help with that.", AnalysisStyle::ObjectionHandling)
                .unwrap_err();
        match err {
            CoachError::InvalidOutput { raw_excerpt, .. } => {
                assert!(raw_excerpt.contains("I cannot help"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn top_level_array_is_parse_error() {
        let err = parse_coaching_result("[1, 2, 3]", AnalysisStyle::ObjectionHandling)
            .unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn wrong_typed_string_field_is_parse_error() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["customer_intent"] = serde_json::json!(42);
        let err = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap_err();
        assert!(err.to_string().contains("customer_intent"));
    }

    #[test]
    fn missing_actions_is_parse_error() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value.as_object_mut().unwrap().remove("recommended_actions");
        let err = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap_err();
        assert!(err.to_string().contains("recommended_actions"));
    }

    #[test]
    fn empty_actions_is_parse_error() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["recommended_actions"] = serde_json::json!([]);
        assert!(
            parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling).is_err()
        );
    }

    #[test]
    fn duplicate_action_styles_is_parse_error() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["recommended_actions"] = serde_json::json!([
            {"style": "empathy and rapport", "script": "a\nb\nc"},
            {"style": "empathy and rapport", "script": "d\ne\nf"}
        ]);
        let err = parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate action style"));
    }

    #[test]
    fn action_without_script_is_parse_error() {
        let mut value: Value = serde_json::from_str(&valid_json()).unwrap();
        value["recommended_actions"] = serde_json::json!([
            {"style": "empathy and rapport"}
        ]);
        assert!(
            parse_coaching_result(&value.to_string(), AnalysisStyle::ObjectionHandling).is_err()
        );
    }

    #[test]
    fn raw_excerpt_is_capped() {
        let long: String = std::iter::repeat('x').take(2000).collect();
        let err =
            parse_coaching_result(&long, AnalysisStyle::ObjectionHandling).unwrap_err();
        match err {
            CoachError::InvalidOutput { raw_excerpt, .. } => {
                assert_eq!(raw_excerpt.chars().count(), 500);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn result_serializes_round_trip() {
        let result =
            parse_coaching_result(&valid_json(), AnalysisStyle::ObjectionHandling).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: CoachingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
