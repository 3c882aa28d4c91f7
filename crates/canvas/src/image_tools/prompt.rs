use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::failure::ToolFailure;

pub const MIN_PROMPT_LENGTH: usize = 1;
pub const MAX_PROMPT_LENGTH: usize = 1024;

/// Words the image model tends to read as requests for the thing negated
pub const NEGATION_WORDS: [&str; 15] = [
    "no", "not", "neither", "never", "no one", "nobody", "none", "nor", "nothing", "nowhere",
    "without", "barely", "hardly", "scarcely", "seldom",
];

lazy_static! {
    static ref NEGATION_PATTERNS: Vec<(&'static str, Regex)> = NEGATION_WORDS
        .iter()
        .map(|word| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
            (*word, Regex::new(&pattern).unwrap())
        })
        .collect();
}

/// Negation words present in `text`, in the order of [`NEGATION_WORDS`]
pub fn negation_words(text: &str) -> Vec<&'static str> {
    NEGATION_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(word, _)| *word)
        .collect()
}

/// Check a free-form prompt against the model's length limits
pub fn check_length(prompt: &str) -> Result<(), ToolFailure> {
    let length = prompt.chars().count();
    if length < MIN_PROMPT_LENGTH {
        return Err(ToolFailure::validation(format!(
            "Prompt must be at least {} character long",
            MIN_PROMPT_LENGTH
        ))
        .with_steps(["Describe the image to generate"]));
    }
    if length > MAX_PROMPT_LENGTH {
        return Err(ToolFailure::validation(format!(
            "Prompt length {} exceeds the maximum of {} characters",
            length, MAX_PROMPT_LENGTH
        ))
        .with_steps(["Shorten the prompt", "Move exclusions to the negative prompt"]));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// A prompt split into the parts the image model responds to best
pub struct PromptStructure {
    pub title: Option<String>,
    pub subject: String,
    pub environment: String,
    pub action: String,
    pub lighting: String,
    pub camera: String,
    pub style: String,
}

impl PromptStructure {
    pub fn new<S: Into<String>>(subject: S) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    /// Join the non-empty parts into the labelled prompt text
    pub fn generate(&self) -> Result<String, ToolFailure> {
        let parts = [
            ("Subject", &self.subject),
            ("Environment", &self.environment),
            ("Subject action, position, and pose", &self.action),
            ("Lighting", &self.lighting),
            ("Camera position and framing", &self.camera),
            ("Image style", &self.style),
        ];
        let prompt = parts
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| format!("{}: {}", label, value.trim()))
            .collect::<Vec<_>>()
            .join(", \n");

        check_length(&prompt)?;
        if self.subject.trim().is_empty() {
            return Err(ToolFailure::validation("Subject is a required field")
                .with_steps(["Name the main subject of the image"]));
        }
        Ok(prompt)
    }

    /// Negation words across every part of the prompt
    pub fn negation_words(&self) -> Vec<&'static str> {
        let text = [
            &self.subject,
            &self.environment,
            &self.action,
            &self.lighting,
            &self.camera,
            &self.style,
        ]
        .map(String::as_str)
        .join(" ");
        negation_words(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_tools::FailureKind;

    #[test]
    fn test_generate_skips_empty_parts() {
        let prompt = PromptStructure {
            subject: "Calico colored cat ".to_string(),
            environment: "Cozy living room".to_string(),
            lighting: "  ".to_string(),
            style: "Oil on canvas".to_string(),
            ..Default::default()
        };
        assert_eq!(
            prompt.generate().unwrap(),
            "Subject: Calico colored cat, \nEnvironment: Cozy living room, \nImage style: Oil on canvas"
        );
    }

    #[test]
    fn test_subject_is_required() {
        let empty = PromptStructure::default().generate().unwrap_err();
        assert_eq!(empty.kind, FailureKind::ValidationError);
        assert!(empty.error.contains("at least 1"));

        let no_subject = PromptStructure {
            environment: "Medieval castle ruins".to_string(),
            ..Default::default()
        };
        assert_eq!(
            no_subject.generate().unwrap_err().error,
            "Subject is a required field"
        );
    }

    #[test]
    fn test_length_limit() {
        let long = PromptStructure::new("x".repeat(MAX_PROMPT_LENGTH));
        let failure = long.generate().unwrap_err();
        assert!(failure.error.contains("exceeds the maximum of 1024"));

        assert!(check_length(&"é".repeat(MAX_PROMPT_LENGTH)).is_ok());
        assert!(check_length("").is_err());
    }

    #[test]
    fn test_negation_words() {
        assert_eq!(
            negation_words("A street with No cars and nobody around"),
            vec!["no", "nobody"]
        );
        assert_eq!(negation_words("No one is here"), vec!["no", "no one"]);
        assert!(negation_words("notable knots, nonetheless").is_empty());

        let prompt = PromptStructure {
            subject: "Woman in a large hat".to_string(),
            camera: "without blur".to_string(),
            ..Default::default()
        };
        assert_eq!(prompt.negation_words(), vec!["without"]);
    }
}
