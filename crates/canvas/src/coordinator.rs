//! Runs tool calls requested by the model.
//!
//! Each call moves through a fixed sequence of states:
//!
//! ```text
//! Received -> ArgsResolved -> Invoked -> ResultParsed -> Delivered
//!     |             |
//!     +-> Failed    +-> Failed
//! ```
//!
//! Argument resolution fails on an unknown image reference, in which case the tool
//! is never invoked. Invocation fails when no system offers the tool or the tool
//! reports an error. Failures are terminal and not retried. Parsing cannot fail.
use tracing::{debug, info, warn};

use crate::errors::AgentError;
use crate::images::{resolve_references, ImageStore};
use crate::models::content::{ToolResultContent, ToolResultStatus};
use crate::models::message::{ContentBlock, Message, ToolUse};
use crate::models::tool::ToolCall;
use crate::result_parser::{parse, ParsedResult};
use crate::systems::System;

/// The UI side of tool execution
pub trait ResultSink: Send + Sync {
    /// Render a decoded tool result
    fn deliver(&self, tool_use_id: &str, result: &ParsedResult);

    /// Report a tool call that could not complete
    fn fail(&self, tool_use_id: &str, error: &AgentError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Received,
    ArgsResolved,
    Invoked,
    ResultParsed,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
/// The path one tool call took and where it ended
pub struct CallReport {
    pub tool_use_id: String,
    pub trail: Vec<CallState>,
    pub result: Result<ParsedResult, AgentError>,
}

impl CallReport {
    pub fn state(&self) -> CallState {
        self.trail.last().copied().unwrap_or(CallState::Received)
    }

    /// The tool result block that goes back to the model
    pub fn to_block(&self) -> ContentBlock {
        match &self.result {
            Ok(parsed) => {
                let status = if parsed.success() == Some(false) {
                    ToolResultStatus::Error
                } else {
                    ToolResultStatus::Success
                };
                ContentBlock::tool_result(&self.tool_use_id, status, vec![parsed.to_content()])
            }
            Err(error) => ContentBlock::tool_result(
                &self.tool_use_id,
                ToolResultStatus::Error,
                vec![ToolResultContent::text(error.to_string())],
            ),
        }
    }
}

pub struct ToolExecutionCoordinator<'a> {
    systems: &'a [Box<dyn System>],
    store: &'a ImageStore,
    sink: &'a dyn ResultSink,
}

impl<'a> ToolExecutionCoordinator<'a> {
    pub fn new(
        systems: &'a [Box<dyn System>],
        store: &'a ImageStore,
        sink: &'a dyn ResultSink,
    ) -> Self {
        Self {
            systems,
            store,
            sink,
        }
    }

    fn system_for_tool(&self, name: &str) -> Option<&dyn System> {
        self.systems
            .iter()
            .find(|system| system.has_tool(name))
            .map(|system| &**system)
    }

    /// Drive a single tool call to `Delivered` or `Failed`
    pub async fn execute(&self, tool_use: &ToolUse) -> CallReport {
        let id = tool_use.tool_use_id.as_str();
        let mut trail = vec![CallState::Received];

        let result = self.run(tool_use, &mut trail).await;
        match &result {
            Ok(parsed) => {
                self.sink.deliver(id, parsed);
                trail.push(CallState::Delivered);
            }
            Err(error) => {
                warn!(tool = %tool_use.name, id, %error, "tool call failed");
                self.sink.fail(id, error);
                trail.push(CallState::Failed);
            }
        }

        CallReport {
            tool_use_id: id.to_string(),
            trail,
            result,
        }
    }

    async fn run(
        &self,
        tool_use: &ToolUse,
        trail: &mut Vec<CallState>,
    ) -> Result<ParsedResult, AgentError> {
        let arguments = resolve_references(&tool_use.input, self.store)?;
        trail.push(CallState::ArgsResolved);

        let system = self
            .system_for_tool(&tool_use.name)
            .ok_or_else(|| AgentError::ToolNotFound(tool_use.name.clone()))?;
        info!(tool = %tool_use.name, system = system.name(), "invoking tool");
        let raw = system
            .call(ToolCall::new(&tool_use.name, arguments))
            .await?;
        trail.push(CallState::Invoked);

        let parsed = parse(&raw);
        trail.push(CallState::ResultParsed);
        debug!(tool = %tool_use.name, structured = parsed.is_structured(), "tool result parsed");
        Ok(parsed)
    }

    /// Run every tool use in `message` in the order the model issued them.
    ///
    /// Returns the user message carrying one result per call, or `None` when the
    /// message requested no tools.
    pub async fn execute_all(&self, message: &Message) -> Option<Message> {
        let mut response = Message::user();
        for tool_use in message.tool_uses() {
            let report = self.execute(tool_use).await;
            response = response.with_content(report.to_block());
        }
        (!response.content.is_empty()).then_some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentResult;
    use crate::images::ImagePayload;
    use crate::models::content::ImageFormat;
    use crate::models::tool::Tool;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct MockSystem {
        tools: Vec<Tool>,
        response: AgentResult<String>,
        calls: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<ToolCall>>>,
    }

    impl MockSystem {
        fn new(response: AgentResult<String>) -> Self {
            Self {
                tools: vec![Tool::new(
                    "virtual_tryon",
                    "Dress the person in the source image",
                    json!({"type": "object", "properties": {"source_image": {"type": "string"}}}),
                )],
                response,
                calls: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl System for MockSystem {
        fn name(&self) -> &str {
            "canvas"
        }

        fn description(&self) -> &str {
            "A mock image system"
        }

        fn instructions(&self) -> &str {
            "Mock instructions"
        }

        fn tools(&self) -> &[Tool] {
            &self.tools
        }

        async fn call(&self, tool_call: ToolCall) -> AgentResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(tool_call);
            self.response.clone()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, ParsedResult)>>,
        failed: Mutex<Vec<(String, AgentError)>>,
    }

    impl ResultSink for RecordingSink {
        fn deliver(&self, tool_use_id: &str, result: &ParsedResult) {
            self.delivered
                .lock()
                .unwrap()
                .push((tool_use_id.to_string(), result.clone()));
        }

        fn fail(&self, tool_use_id: &str, error: &AgentError) {
            self.failed
                .lock()
                .unwrap()
                .push((tool_use_id.to_string(), error.clone()));
        }
    }

    fn store() -> ImageStore {
        let mut store = ImageStore::new();
        store.put(
            "image_1",
            ImagePayload {
                data: "payloadA".to_string(),
                format: ImageFormat::Png,
            },
        );
        store
    }

    fn tool_use(input: serde_json::Value) -> ToolUse {
        ToolUse {
            tool_use_id: "call-1".to_string(),
            name: "virtual_tryon".to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn test_delivers_parsed_result() {
        let system = MockSystem::new(Ok("{'success': True, 'image': 'QUJD'}".to_string()));
        let seen = system.seen.clone();
        let systems: Vec<Box<dyn System>> = vec![Box::new(system)];
        let store = store();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let report = coordinator
            .execute(&tool_use(json!({"source_image": "image_1"})))
            .await;

        assert_eq!(
            report.trail,
            vec![
                CallState::Received,
                CallState::ArgsResolved,
                CallState::Invoked,
                CallState::ResultParsed,
                CallState::Delivered,
            ]
        );
        assert_eq!(report.result.as_ref().unwrap().success(), Some(true));
        assert_eq!(
            seen.lock().unwrap()[0].arguments,
            json!({"source_image": "payloadA"})
        );

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "call-1");
        assert!(sink.failed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_reference_never_invokes_tool() {
        let system = MockSystem::new(Ok("{}".to_string()));
        let calls = system.calls.clone();
        let systems: Vec<Box<dyn System>> = vec![Box::new(system)];
        let store = store();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let report = coordinator
            .execute(&tool_use(json!({"source_image": "image_9"})))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.state(), CallState::Failed);
        assert_eq!(report.trail, vec![CallState::Received, CallState::Failed]);
        assert_eq!(
            report.result,
            Err(AgentError::MissingImageReference("image_9".to_string()))
        );
        assert_eq!(sink.failed.lock().unwrap().len(), 1);
        assert!(sink.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tool_error_fails_at_invocation() {
        let system = MockSystem::new(Err(AgentError::ExecutionError("quota exceeded".into())));
        let calls = system.calls.clone();
        let systems: Vec<Box<dyn System>> = vec![Box::new(system)];
        let store = store();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let report = coordinator.execute(&tool_use(json!({}))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            report.trail,
            vec![CallState::Received, CallState::ArgsResolved, CallState::Failed]
        );
        assert_eq!(
            report.to_block(),
            ContentBlock::tool_result(
                "call-1",
                ToolResultStatus::Error,
                vec![ToolResultContent::text("Tool execution failed: quota exceeded")],
            )
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let systems: Vec<Box<dyn System>> = vec![];
        let store = ImageStore::new();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let report = coordinator.execute(&tool_use(json!({}))).await;
        assert_eq!(
            report.result,
            Err(AgentError::ToolNotFound("virtual_tryon".to_string()))
        );
    }

    #[tokio::test]
    async fn test_execute_all_in_arrival_order() {
        let system = MockSystem::new(Ok("plain output".to_string()));
        let seen = system.seen.clone();
        let systems: Vec<Box<dyn System>> = vec![Box::new(system)];
        let store = store();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let message = Message::assistant()
            .with_text("Running both")
            .with_tool_use("first", "virtual_tryon", json!({"n": 1}))
            .with_tool_use("second", "virtual_tryon", json!({"source_image": "image_2"}))
            .with_tool_use("third", "virtual_tryon", json!({"n": 3}));

        let response = coordinator.execute_all(&message).await.unwrap();
        let ids: Vec<&str> = response
            .content
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .map(|r| r.tool_use_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);

        let statuses: Vec<ToolResultStatus> = response
            .content
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .map(|r| r.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                ToolResultStatus::Success,
                ToolResultStatus::Error,
                ToolResultStatus::Success
            ]
        );
        assert_eq!(seen.lock().unwrap().len(), 2);

        assert!(coordinator
            .execute_all(&Message::assistant().with_text("no tools"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_reported_failure_marks_error_status() {
        let system = MockSystem::new(Ok(r#"{"success": false, "error": "bad mask"}"#.to_string()));
        let systems: Vec<Box<dyn System>> = vec![Box::new(system)];
        let store = store();
        let sink = RecordingSink::default();
        let coordinator = ToolExecutionCoordinator::new(&systems, &store, &sink);

        let report = coordinator.execute(&tool_use(json!({}))).await;
        assert_eq!(report.state(), CallState::Delivered);
        let block = report.to_block();
        assert_eq!(
            block.as_tool_result().unwrap().status,
            ToolResultStatus::Error
        );
    }
}
