//! These models represent the objects passed around by the pipeline
//!
//! The serialized shape follows the conversation schema exchanged with the model
//! backend and the history store: every content block is a single-key object
//! (`text`, `image`, `toolUse`, `toolResult`, `cachePoint`). Keeping the internal
//! structs in that shape means history loaded from disk can be handed to the
//! annotator and the agent without a conversion layer.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
