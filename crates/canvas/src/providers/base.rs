use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::CacheSupport;
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub cache_read_tokens: Option<i32>,
    pub cache_write_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            ..Default::default()
        }
    }

    pub fn with_cache(mut self, read: Option<i32>, write: Option<i32>) -> Self {
        self.cache_read_tokens = read;
        self.cache_write_tokens = write;
        self
    }
}

/// Base trait for model backends.
///
/// `messages` arrive already annotated with cache markers. `cache` carries the
/// categories the model can cache, so the provider can also mark the system prompt
/// (`system`) and the tool definitions (`tools`) in its own request format.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message using the configured model
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        cache: &CacheSupport,
    ) -> Result<(Message, Usage)>;
}
