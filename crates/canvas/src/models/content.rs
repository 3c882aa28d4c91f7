use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
/// Image encodings accepted by the model backend and the image tools
pub enum ImageFormat {
    Png,
    #[serde(alias = "jpg")]
    #[strum(to_string = "jpeg", serialize = "jpg")]
    Jpeg,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Parse a MIME type such as `image/png`
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        mime_type
            .strip_prefix("image/")
            .and_then(|subtype| ImageFormat::from_str(subtype).ok())
    }

    /// Infer the format from a file name's extension
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ImageFormat::from_str(ext).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Base64 encoded image bytes, without any data URL prefix
    pub data: String,
    pub format: ImageFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolResultStatus {
    #[default]
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Content carried inside a tool result
pub enum ToolResultContent {
    Text(String),
    Json(Value),
    Image(ImageContent),
}

impl ToolResultContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ToolResultContent::Text(text.into())
    }

    /// Get the text content if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolResultContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ToolResultContent::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    #[default]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
/// Payload of a cache boundary; the backend only knows the `default` type
pub struct CachePoint {
    #[serde(rename = "type")]
    pub cache_type: CacheType,
}
