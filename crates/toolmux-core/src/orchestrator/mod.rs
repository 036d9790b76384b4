//! Query orchestration
//!
//! One query runs as a fixed sequence of states:
//!
//! ```text
//! Seed → Catalog → FirstRound ──(text only)──────────────────► Done
//!                       └──(tool calls)→ Dispatch → SecondRound → Done
//! ```
//!
//! The conversation's lock is held from `Seed` to `Done`, so two queries
//! against the same conversation never interleave.

mod query;

pub use query::{QueryOrchestrator, NO_RESPONSE, TASK_COMPLETED};
