//! Prompt cache boundaries for outgoing conversations.
//!
//! The model backend can reuse computation up to a `cachePoint` block. Marking the
//! two most recent user turns keeps the cached prefix valid across consecutive
//! requests in the same conversation: the previous request's last marker is still
//! present when the next request is sent.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::models::message::{ContentBlock, Conversation, Message};
use crate::models::role::Role;

/// Number of user turns that receive a cache boundary
pub const CACHED_USER_TURNS: usize = 2;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
/// Payload categories a model may be able to cache
pub enum CacheCategory {
    System,
    Messages,
    Tools,
}

pub type CacheSupport = HashSet<CacheCategory>;

/// Return a copy of `conversation` with cache markers at the end of the most recent
/// user turns.
///
/// Markers already present anywhere in the input are dropped first, so running this
/// on its own output places the same markers again. Nothing is marked unless
/// `cacheable` contains [`CacheCategory::Messages`]; the other categories describe
/// the system prompt and tool definitions, which the provider handles itself.
///
/// A user message only counts as a turn when it carries text. Messages that only
/// return tool results to the model are skipped.
pub fn annotate(conversation: &Conversation, cacheable: &CacheSupport) -> Conversation {
    let mut annotated: Vec<Message> = conversation.iter().map(strip_markers).collect();

    if !cacheable.contains(&CacheCategory::Messages) {
        return annotated.into();
    }

    let turns: Vec<usize> = annotated
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, message)| message.role == Role::User && message.has_text())
        .map(|(index, _)| index)
        .take(CACHED_USER_TURNS)
        .collect();

    for &index in &turns {
        annotated[index].content.push(ContentBlock::cache_marker());
    }
    debug!(marked = ?turns, "placed cache markers");

    annotated.into()
}

fn strip_markers(message: &Message) -> Message {
    Message {
        role: message.role,
        content: message
            .content
            .iter()
            .filter(|block| !block.is_cache_marker())
            .cloned()
            .collect(),
    }
}
