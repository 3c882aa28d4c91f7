//! Session-scoped image storage and symbolic reference resolution.
//!
//! Uploaded and generated images are kept out of the conversation sent to the model.
//! Instead each one is registered under a short name (`image_1`, `image_2`, ...) and
//! the model refers to images by name in tool-call arguments. Before a tool runs, the
//! coordinator rewrites those names into the stored base64 payloads, so tool
//! implementations receive image data directly and never read session state.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::{AgentError, AgentResult};
use crate::models::content::{ImageContent, ImageFormat};

lazy_static! {
    static ref IMAGE_REFERENCE: Regex = Regex::new(r"^image_[1-9][0-9]*$").unwrap();
}

const REFERENCE_PREFIX: &str = "image_";

/// True when `value` is a symbolic image name such as `image_3`
pub fn is_image_reference(value: &str) -> bool {
    IMAGE_REFERENCE.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Base64 encoded image bytes and their format
pub struct ImagePayload {
    pub data: String,
    pub format: ImageFormat,
}

impl ImagePayload {
    pub fn from_bytes(bytes: &[u8], format: ImageFormat) -> AgentResult<Self> {
        if bytes.is_empty() {
            return Err(AgentError::InvalidImage("image data is empty".into()));
        }
        Ok(Self {
            data: STANDARD.encode(bytes),
            format,
        })
    }

    /// Accept plain base64 or a `data:image/...;base64,` URL.
    ///
    /// The data URL's declared type wins over `format` when it names a known format.
    pub fn from_encoded(encoded: &str, format: ImageFormat) -> AgentResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(AgentError::InvalidImage("image data is empty".into()));
        }

        let (data, format) = match encoded.strip_prefix("data:") {
            Some(url) => {
                let (header, data) = url.split_once(',').ok_or_else(|| {
                    AgentError::InvalidImage("data URL has no payload".into())
                })?;
                let mime_type = header.split(';').next().unwrap_or_default();
                (data, ImageFormat::from_mime(mime_type).unwrap_or(format))
            }
            None => (encoded, format),
        };

        STANDARD
            .decode(data)
            .map_err(|e| AgentError::InvalidImage(format!("invalid base64: {}", e)))?;

        Ok(Self {
            data: data.to_string(),
            format,
        })
    }

    /// Identify the format from the leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"\xff\xd8\xff") {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else {
            None
        }
    }

    pub fn to_content(&self) -> ImageContent {
        ImageContent {
            data: self.data.clone(),
            format: self.format,
        }
    }
}

#[derive(Debug, Default, Clone)]
/// Images available to tool calls during one session or turn
pub struct ImageStore {
    entries: BTreeMap<String, ImagePayload>,
    next_index: usize,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a payload under an explicit name, replacing any previous entry
    pub fn put<S: Into<String>>(&mut self, name: S, payload: ImagePayload) -> Option<ImagePayload> {
        let name = name.into();
        if let Some(index) = name
            .strip_prefix(REFERENCE_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
        {
            self.next_index = self.next_index.max(index);
        }
        let previous = self.entries.insert(name.clone(), payload);
        if previous.is_some() {
            warn!(name = %name, "replaced image in store");
        }
        previous
    }

    /// Register a payload under the next free sequential name and return the name.
    ///
    /// Fails when an explicitly named `image_N` has already used the largest index.
    pub fn attach(&mut self, payload: ImagePayload) -> AgentResult<String> {
        let index = self.next_index.checked_add(1).ok_or_else(|| {
            AgentError::Internal("no sequential image names left in the store".into())
        })?;
        self.next_index = index;
        let name = format!("{}{}", REFERENCE_PREFIX, index);
        self.entries.insert(name.clone(), payload);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> AgentResult<&ImagePayload> {
        self.entries
            .get(name)
            .ok_or_else(|| AgentError::MissingImageReference(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every image, e.g. when the session ends
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_index = 0;
    }
}

/// Replace every image reference in a tool-call argument tree with its payload.
///
/// Only strings that are exactly a reference are substituted; anything else,
/// including text that merely mentions `image_1`, passes through. Fails on the first
/// reference the store does not hold, in document order.
pub fn resolve_references(arguments: &Value, store: &ImageStore) -> AgentResult<Value> {
    match arguments {
        Value::String(s) if is_image_reference(s) => {
            Ok(Value::String(store.get(s)?.data.clone()))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_references(item, store))
            .collect::<AgentResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve_references(value, store)?)))
            .collect::<AgentResult<Map<_, _>>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(data: &str) -> ImagePayload {
        ImagePayload {
            data: data.to_string(),
            format: ImageFormat::Png,
        }
    }

    #[test]
    fn test_reference_pattern() {
        assert!(is_image_reference("image_1"));
        assert!(is_image_reference("image_42"));
        assert!(!is_image_reference("image_0"));
        assert!(!is_image_reference("image_01"));
        assert!(!is_image_reference("image_"));
        assert!(!is_image_reference("image_1.png"));
        assert!(!is_image_reference("see image_1"));
        assert!(!is_image_reference("IMAGE_1"));
    }

    #[test]
    fn test_resolve_substitutes_payload() {
        let mut store = ImageStore::new();
        store.put("image_1", payload("payloadA"));

        let resolved = resolve_references(&json!({"source_image": "image_1"}), &store).unwrap();
        assert_eq!(resolved, json!({"source_image": "payloadA"}));
    }

    #[test]
    fn test_resolve_missing_reference() {
        let mut store = ImageStore::new();
        store.put("image_1", payload("payloadA"));

        let error = resolve_references(&json!({"source_image": "image_9"}), &store).unwrap_err();
        assert_eq!(error, AgentError::MissingImageReference("image_9".to_string()));
    }

    #[test]
    fn test_resolve_nested_and_passthrough() {
        let mut store = ImageStore::new();
        store.put("image_1", payload("A"));
        store.put("image_2", payload("B"));

        let arguments = json!({
            "prompt": "put image_1 on a beach",
            "images": ["image_1", "image_2"],
            "options": {"mask": "image_2", "count": 2, "seed": null, "enabled": true}
        });
        let resolved = resolve_references(&arguments, &store).unwrap();
        assert_eq!(
            resolved,
            json!({
                "prompt": "put image_1 on a beach",
                "images": ["A", "B"],
                "options": {"mask": "B", "count": 2, "seed": null, "enabled": true}
            })
        );
    }

    #[test]
    fn test_resolve_is_deterministic_and_read_only() {
        let mut store = ImageStore::new();
        store.put("image_1", payload("A"));
        let arguments = json!({"a": "image_1", "b": ["image_7", "image_3"]});

        let first = resolve_references(&arguments, &store);
        let second = resolve_references(&arguments, &store);
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("image_1").unwrap(), &payload("A"));
    }

    #[test]
    fn test_attach_assigns_sequential_names() {
        let mut store = ImageStore::new();
        assert_eq!(store.attach(payload("A")).unwrap(), "image_1");
        assert_eq!(store.attach(payload("B")).unwrap(), "image_2");

        store.put("image_5", payload("E"));
        assert_eq!(store.attach(payload("F")).unwrap(), "image_6");
        assert_eq!(
            store.names().collect::<Vec<_>>(),
            vec!["image_1", "image_2", "image_5", "image_6"]
        );

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.attach(payload("G")).unwrap(), "image_1");
    }

    #[test]
    fn test_attach_fails_when_indices_are_exhausted() {
        let mut store = ImageStore::new();
        let last = format!("image_{}", usize::MAX);
        assert!(is_image_reference(&last));
        store.put(last.as_str(), payload("A"));

        assert!(matches!(
            store.attach(payload("B")),
            Err(AgentError::Internal(_))
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&last).unwrap(), &payload("A"));
    }

    #[test]
    fn test_put_replaces() {
        let mut store = ImageStore::new();
        assert!(store.put("image_1", payload("A")).is_none());
        assert_eq!(store.put("image_1", payload("B")), Some(payload("A")));
        assert_eq!(store.get("image_1").unwrap().data, "B");
    }

    #[test]
    fn test_payload_from_bytes() {
        let image = ImagePayload::from_bytes(b"ABC", ImageFormat::Png).unwrap();
        assert_eq!(image.data, "QUJD");
        assert!(matches!(
            ImagePayload::from_bytes(b"", ImageFormat::Png),
            Err(AgentError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_payload_from_encoded() {
        let plain = ImagePayload::from_encoded("QUJD", ImageFormat::Png).unwrap();
        assert_eq!(plain.data, "QUJD");
        assert_eq!(plain.format, ImageFormat::Png);

        let url = ImagePayload::from_encoded("data:image/jpeg;base64,QUJD", ImageFormat::Png)
            .unwrap();
        assert_eq!(url.data, "QUJD");
        assert_eq!(url.format, ImageFormat::Jpeg);

        for bad in ["", "   ", "data:image/png;base64", "not base64!"] {
            assert!(
                matches!(
                    ImagePayload::from_encoded(bad, ImageFormat::Png),
                    Err(AgentError::InvalidImage(_))
                ),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(
            ImagePayload::sniff(b"\x89PNG\r\n\x1a\n\0\0"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImagePayload::sniff(b"\xff\xd8\xff\xe0"), Some(ImageFormat::Jpeg));
        assert_eq!(ImagePayload::sniff(b"GIF89a..."), Some(ImageFormat::Gif));
        assert_eq!(
            ImagePayload::sniff(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImagePayload::sniff(b"plain"), None);
    }
}
