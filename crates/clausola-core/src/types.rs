use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Full payload of a successful analyze/retranslate call. Replaced wholesale on
/// retranslation, never merged. Every field is lenient: a server that omits a
/// field yields a default instead of a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub document_text: String,
    #[serde(default)]
    pub summary: SummaryBlock,
    #[serde(default, deserialize_with = "shadow_text")]
    pub shadow_analysis: String,
    #[serde(default)]
    pub evaluation: EvaluationBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SummaryBlock {
    #[serde(default)]
    pub executive_summary: String,
    /// Newline-delimited items.
    #[serde(default)]
    pub key_points: String,
    #[serde(default)]
    pub potential_issues: String,
    #[serde(default)]
    pub recommendations: String,
    /// Open key set defined by the server; only the reserved `overall_score`
    /// key is filtered out at render time. BTreeMap keeps render order stable.
    #[serde(default)]
    pub structured_analysis: BTreeMap<String, CategoryScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryScore {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub content: String,
}

/// Nested one level on the wire: `{"evaluation": {"overall_score": 7}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvaluationBlock {
    #[serde(default)]
    pub evaluation: OverallScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OverallScore {
    #[serde(default)]
    pub overall_score: f64,
}

/// Some server revisions send `shadow_analysis` as a bare string, others as an
/// object carrying a `content` field. Both decode to the text.
fn shadow_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Object(map) => map
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractResponse {
    #[serde(default)]
    pub text: String,
}

/// One entry in the chat transcript. Append-only; never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    pub is_user: bool,
    pub timestamp: SystemTime,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, is_user: bool) -> Self {
        ChatMessage {
            text: text.into(),
            is_user,
            timestamp: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub summary: SearchSummary,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchSummary {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content_summary: String,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    // older server revisions name this field "relevance"
    #[serde(default, alias = "relevance")]
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FrequentQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoryEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub asked_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuthStatus {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default, deserialize_with = "opt_id")]
    pub user_id: Option<String>,
}

/// User ids arrive as integers from the database-backed server and as strings
/// from older revisions.
fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_result_tolerates_missing_fields() {
        let result: AnalysisResult = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(result.status, "success");
        assert_eq!(result.document_text, "");
        assert_eq!(result.shadow_analysis, "");
        assert!(result.summary.structured_analysis.is_empty());
        assert_eq!(result.evaluation.evaluation.overall_score, 0.0);
    }

    #[test]
    fn shadow_analysis_accepts_string_and_block() {
        let bare: AnalysisResult =
            serde_json::from_str(r#"{"shadow_analysis":"plain text"}"#).unwrap();
        assert_eq!(bare.shadow_analysis, "plain text");

        let block: AnalysisResult =
            serde_json::from_str(r#"{"shadow_analysis":{"content":"from block"}}"#).unwrap();
        assert_eq!(block.shadow_analysis, "from block");

        let null: AnalysisResult = serde_json::from_str(r#"{"shadow_analysis":null}"#).unwrap();
        assert_eq!(null.shadow_analysis, "");
    }

    #[test]
    fn structured_analysis_keys_are_open() {
        let json = r#"{
            "structured_analysis": {
                "clarity": {"score": 9, "content": "Clear"},
                "some_new_category": {"score": 5, "content": ""},
                "overall_score": {"score": 7, "content": ""}
            }
        }"#;
        let summary: SummaryBlock = serde_json::from_str(json).unwrap();
        assert_eq!(summary.structured_analysis.len(), 3);
        assert_eq!(summary.structured_analysis["clarity"].score, 9.0);
    }

    #[test]
    fn search_result_accepts_relevance_alias() {
        let result: SearchResult =
            serde_json::from_str(r#"{"title":"t","relevance":0.82}"#).unwrap();
        assert_eq!(result.relevance_score, 0.82);
    }

    #[test]
    fn auth_status_accepts_numeric_user_id() {
        let status: AuthStatus =
            serde_json::from_str(r#"{"authenticated":true,"user_id":42}"#).unwrap();
        assert_eq!(status.user_id.as_deref(), Some("42"));
    }
}
