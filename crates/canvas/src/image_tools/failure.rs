use serde_json::{json, Map, Value};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
/// The `error_type` reported with a failed tool result
pub enum FailureKind {
    ValidationError,
    InvalidStyle,
    ImageExtractionError,
    ModelError,
    EmptyResponse,
    SaveError,
}

#[derive(Debug, Clone, PartialEq)]
/// A failed tool result in the shape the UI renders
pub struct ToolFailure {
    pub kind: FailureKind,
    pub error: String,
    pub message: String,
    pub troubleshooting: Vec<String>,
}

impl ToolFailure {
    pub fn new<E: Into<String>>(kind: FailureKind, error: E) -> Self {
        let message = match kind {
            FailureKind::ValidationError => "The tool parameters were rejected",
            FailureKind::InvalidStyle => "The style option is not available",
            FailureKind::ImageExtractionError => "The image data could not be read",
            FailureKind::ModelError => "The image model reported an error",
            FailureKind::EmptyResponse => "The image model returned no images",
            FailureKind::SaveError => "The generated image could not be saved",
        };
        Self {
            kind,
            error: error.into(),
            message: message.to_string(),
            troubleshooting: Vec::new(),
        }
    }

    pub fn validation<E: Into<String>>(error: E) -> Self {
        Self::new(FailureKind::ValidationError, error)
    }

    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.troubleshooting.extend(steps.into_iter().map(Into::into));
        self
    }

    /// `{"success": false, "error", "error_type", "message", "troubleshooting"}`,
    /// with the steps keyed `step1`, `step2`, ...
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "success": false,
            "error": self.error,
            "error_type": self.kind.to_string(),
            "message": self.message,
        });
        if !self.troubleshooting.is_empty() {
            let steps: Map<String, Value> = self
                .troubleshooting
                .iter()
                .enumerate()
                .map(|(i, step)| (format!("step{}", i + 1), json!(step)))
                .collect();
            value["troubleshooting"] = Value::Object(steps);
        }
        value
    }
}
