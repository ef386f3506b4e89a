//! Result and wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything produced for one upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveOutput {
    /// Questions found in the upload, in reply order.
    pub problems: Vec<String>,
    /// LaTeX solutions; `solutions[i]` answers `problems[i]`.
    pub solutions: Vec<String>,
    pub stats: SolveStats,
}

/// Counters and timings for one upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolveStats {
    /// Characters of text handed to the extraction prompt.
    pub extracted_chars: usize,
    /// Number of LLM round trips (1 extraction + 1 per problem).
    pub llm_calls: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Wall-clock time spent in OCR / PDF text extraction.
    pub extract_duration_ms: u64,
    /// Wall-clock time spent waiting on the LLM.
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub problems: Vec<String>,
    pub solutions: Vec<String>,
}

impl From<SolveOutput> for UploadResponse {
    fn from(out: SolveOutput) -> Self {
        Self {
            problems: out.problems,
            solutions: out.solutions,
        }
    }
}

/// Body of `POST /download-solutions-pdf`. A missing list reads as empty.
///
/// Items may be any JSON value; non-strings are rendered as their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub solutions: Vec<Value>,
}

impl DownloadRequest {
    /// The solutions as display text, in order.
    pub fn into_texts(self) -> Vec<String> {
        self.solutions
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()
    }
}

/// Body of every JSON error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_omits_stats() {
        let out = SolveOutput {
            problems: vec!["Q1".into()],
            solutions: vec!["A1".into()],
            stats: SolveStats {
                llm_calls: 2,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(UploadResponse::from(out)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"problems": ["Q1"], "solutions": ["A1"]})
        );
    }

    #[test]
    fn download_request_accepts_non_string_items() {
        let req: DownloadRequest =
            serde_json::from_str(r#"{"solutions": ["F = ma", 42, 1.5, true, null]}"#).unwrap();
        assert_eq!(
            req.into_texts(),
            vec!["F = ma", "42", "1.5", "true", "null"]
        );
    }

    #[test]
    fn download_request_defaults_to_empty() {
        let req: DownloadRequest = serde_json::from_str("{}").unwrap();
        assert!(req.solutions.is_empty());
    }
}
