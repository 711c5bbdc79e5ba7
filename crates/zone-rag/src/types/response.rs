//! Answer and response payload types

use serde::{Deserialize, Serialize};

use super::document::ZoneCode;
use crate::error::Error;

/// Synthesized answer for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub zone: ZoneCode,
    pub question: String,
    /// Raw completion text
    pub text: String,
}

/// JSON object printed by the command-line shell
///
/// Success and failure share this shape and are told apart by `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub zone_code: String,
    pub query: String,
    /// Answer text (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Human-readable failure reason (failure only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable failure tag (failure only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl QueryResponse {
    /// Build a success payload from an answer
    pub fn from_answer(answer: Answer) -> Self {
        Self {
            success: true,
            zone_code: answer.zone.to_string(),
            query: answer.question,
            result: Some(answer.text),
            error: None,
            error_type: None,
        }
    }

    /// Build a failure payload
    pub fn failure(zone_code: impl Into<String>, query: impl Into<String>, error: &Error) -> Self {
        Self {
            success: false,
            zone_code: zone_code.into(),
            query: query.into(),
            result: None,
            error: Some(error.to_string()),
            error_type: Some(error.error_type().to_string()),
        }
    }

    /// Serialize as JSON, pretty-printed with two-space indentation unless `compact`
    pub fn to_json(&self, compact: bool) -> serde_json::Result<String> {
        if compact {
            serde_json::to_string(self)
        } else {
            serde_json::to_string_pretty(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_payload_shape() {
        let response = QueryResponse::from_answer(Answer {
            zone: ZoneCode::new("H3"),
            question: "What is the maximum building height?".into(),
            text: "8 metres".into(),
        });
        let value: serde_json::Value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["zone_code"], "H3");
        assert_eq!(value["query"], "What is the maximum building height?");
        assert_eq!(value["result"], "8 metres");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_payload_shape() {
        let err = Error::UnknownZone("ZZZ".into());
        let response = QueryResponse::failure("ZZZ", "anything", &err);
        let value: serde_json::Value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error_type"], "unknown_zone");
        assert!(value["error"].as_str().unwrap().contains("Unknown zone"));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_pretty_json_uses_two_space_indent() {
        let err = Error::config("OPENAI_API_KEY environment variable not set");
        let json = QueryResponse::failure("H3", "q", &err).to_json(false).unwrap();
        assert!(json.contains("\n  \"success\": false"));
        assert!(!QueryResponse::failure("H3", "q", &err).to_json(true).unwrap().contains('\n'));
    }
}
