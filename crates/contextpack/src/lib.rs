//! Bounded conversational context: the exchange window over packed
//! history, the round-tripped tool-result snapshot, and assembly of the
//! planner's system prompt from both.

pub mod prompt;
pub mod snapshot;
pub mod window;

pub use prompt::{PromptBuilder, ShiftWeek};
pub use snapshot::{ContextSnapshot, SnapshotEntry};
pub use window::{prompt_turns, window_exchanges, WindowReport};
