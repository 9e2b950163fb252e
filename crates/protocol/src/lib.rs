//! Wire protocol: the envelope records exchanged over the WebSocket and the
//! packed conversation history the client resends on every turn.
//!
//! The server keeps no session store. Everything that must survive between
//! turns travels inside the envelope, and the server owns its schema.

pub mod envelope;
pub mod history;

pub use envelope::{Envelope, EnvelopeRecord, IntentRecord};
pub use history::{ConversationRecord, DecodedHistory, HistoryCodec};
