use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::result_parser::ParsedResult;

const SUCCESS_PREFIX: &str = "SUCCESS: ";
const ERROR_PREFIX: &str = "ERROR: ";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
/// What a tool result means for the user, by the image tools' result contract
pub enum ResultOutcome {
    Succeeded {
        message: Option<String>,
        /// Base64 payloads from `image` and `images`, in that order
        images: Vec<String>,
        image_file: Option<PathBuf>,
    },
    Failed {
        error: String,
        error_type: String,
        troubleshooting: Vec<String>,
    },
    Text(String),
}

impl ResultOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ResultOutcome::Failed { .. })
    }
}

impl From<&ParsedResult> for ResultOutcome {
    fn from(result: &ParsedResult) -> Self {
        match result {
            ParsedResult::Structured(_) if result.success() == Some(false) => {
                ResultOutcome::Failed {
                    error: string_field(result, "error")
                        .unwrap_or_else(|| "Unknown error".to_string()),
                    error_type: string_field(result, "error_type")
                        .unwrap_or_else(|| "Unknown".to_string()),
                    troubleshooting: troubleshooting_hints(result.get("troubleshooting")),
                }
            }
            ParsedResult::Structured(_) => {
                let mut images: Vec<String> = string_field(result, "image").into_iter().collect();
                if let Some(Value::Array(more)) = result.get("images") {
                    images.extend(more.iter().filter_map(Value::as_str).map(String::from));
                }
                ResultOutcome::Succeeded {
                    message: string_field(result, "message"),
                    images,
                    image_file: string_field(result, "image_file")
                        .filter(|path| !path.is_empty())
                        .map(PathBuf::from),
                }
            }
            ParsedResult::PlainText(text) => {
                if let Some(path) = text.strip_prefix(SUCCESS_PREFIX) {
                    ResultOutcome::Succeeded {
                        message: None,
                        images: Vec::new(),
                        image_file: Some(PathBuf::from(path.trim())),
                    }
                } else if let Some(error) = text.strip_prefix(ERROR_PREFIX) {
                    ResultOutcome::Failed {
                        error: error.trim().to_string(),
                        error_type: "Unknown".to_string(),
                        troubleshooting: Vec::new(),
                    }
                } else {
                    ResultOutcome::Text(text.clone())
                }
            }
        }
    }
}

fn string_field(result: &ParsedResult, key: &str) -> Option<String> {
    result.get(key).and_then(Value::as_str).map(String::from)
}

fn troubleshooting_hints(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Object(map)) => map
            .values()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Some(Value::String(hint)) => vec![hint.clone()],
        _ => Vec::new(),
    }
}
