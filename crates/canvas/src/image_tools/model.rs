use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub const NOVA_CANVAS_MODEL_ID: &str = "amazon.nova-canvas-v1:0";

/// The hosted image model. Implementations own the transport and credentials.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Send one inference request body and return the decoded response body
    async fn invoke(&self, model_id: &str, body: &Value) -> Result<Value>;
}

/// Base64 images in a response, whether listed as strings or as `{"image": ...}`
pub fn response_images(response: &Value) -> Vec<String> {
    let listed = match response.get("images") {
        Some(Value::Array(images)) => images
            .iter()
            .filter_map(|image| match image {
                Value::String(data) => Some(data.clone()),
                other => other.get("image").and_then(Value::as_str).map(String::from),
            })
            .collect(),
        _ => Vec::new(),
    };
    if !listed.is_empty() {
        return listed;
    }
    response
        .get("image")
        .and_then(Value::as_str)
        .map(|data| vec![data.to_string()])
        .unwrap_or_default()
}

/// The error message of a response that reports one
pub fn response_error(response: &Value) -> Option<String> {
    match response.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}
