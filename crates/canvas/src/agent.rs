use anyhow::Result;
use futures::stream::BoxStream;
use tracing::{debug, warn};

use crate::cache::annotate;
use crate::configuration::ModelCapabilities;
use crate::coordinator::{ResultSink, ToolExecutionCoordinator};
use crate::images::ImageStore;
use crate::models::message::{Conversation, Message};
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::systems::System;

const BASE_PROMPT: &str = "You are a helpful assistant with access to image generation tools.";

/// Agent integrates a foundational LLM with the systems it needs to pilot
pub struct Agent {
    systems: Vec<Box<dyn System>>,
    provider: Box<dyn Provider>,
    capabilities: ModelCapabilities,
}

impl Agent {
    /// Create a new Agent for a model with the given capabilities
    pub fn new(provider: Box<dyn Provider>, capabilities: ModelCapabilities) -> Self {
        Self {
            systems: Vec::new(),
            provider,
            capabilities,
        }
    }

    /// Add a system to the agent
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    pub fn capabilities(&self) -> &ModelCapabilities {
        &self.capabilities
    }

    fn tools(&self) -> Vec<Tool> {
        self.systems
            .iter()
            .flat_map(|system| system.tools().iter().cloned())
            .collect()
    }

    /// The system prompt, listing the image names the model may pass to tools
    pub fn system_prompt(&self, store: &ImageStore) -> String {
        let mut prompt = String::from(BASE_PROMPT);
        for system in &self.systems {
            prompt.push_str(&format!(
                "\n\n## {}\n{}\n\n{}",
                system.name(),
                system.description(),
                system.instructions()
            ));
        }

        if !store.is_empty() {
            prompt.push_str(&format!("\n\n## Available images: {}\n", store.len()));
            for name in store.names() {
                prompt.push_str(&format!("- \"{}\"\n", name));
            }
            prompt.push_str(
                "\nPass these names as image arguments when calling tools. \
                 The image data is supplied automatically.",
            );
        }
        prompt
    }

    /// Drop image attachments the model cannot read
    fn admit(&self, conversation: &Conversation) -> Vec<Message> {
        if self.capabilities.image_support {
            return conversation.messages().to_vec();
        }

        let mut dropped = 0;
        let messages: Vec<Message> = conversation
            .iter()
            .filter_map(|message| {
                let before = message.content.len();
                let content: Vec<_> = message
                    .content
                    .iter()
                    .filter(|block| !block.is_image())
                    .cloned()
                    .collect();
                dropped += before - content.len();
                (!content.is_empty()).then(|| Message {
                    role: message.role,
                    content,
                })
            })
            .collect();

        if dropped > 0 {
            warn!(dropped, "model does not support images, attachments omitted");
        }
        messages
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and the tool results.
    ///
    /// Tool calls are run one at a time in the order the model issued them. Errors
    /// from the provider end the stream unchanged.
    pub fn reply<'a>(
        &'a self,
        conversation: &Conversation,
        store: &'a ImageStore,
        sink: &'a dyn ResultSink,
    ) -> BoxStream<'a, Result<Message>> {
        let mut messages = self.admit(conversation);
        let tools = self.tools();
        let system_prompt = self.system_prompt(store);
        let cache = self.capabilities.cache_support.clone();

        Box::pin(async_stream::try_stream! {
            loop {
                let annotated = annotate(&Conversation::from(messages.clone()), &cache);

                let (response, usage) = self.provider.complete(
                    &system_prompt,
                    annotated.messages(),
                    &tools,
                    &cache,
                ).await?;
                debug!(?usage, "completion received");

                yield response.clone();

                let coordinator = ToolExecutionCoordinator::new(&self.systems, store, sink);
                let tool_results = match coordinator.execute_all(&response).await {
                    Some(results) => results,
                    // No more tool calls, end the reply loop
                    None => break,
                };

                yield tool_results.clone();

                messages.push(response);
                messages.push(tool_results);
            }
        })
    }
}
