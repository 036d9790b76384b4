//! Per-conversation message history
//!
//! Histories are keyed by an opaque conversation id, created on first use
//! and capped at `2 × max_turns` entries. A leading system entry survives
//! every eviction.

mod store;

pub use store::{ConversationStore, History, SessionHandle};
