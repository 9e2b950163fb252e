//! HistoryCodec: the packed prior-turn bundle carried in a
//! `HistoryContainer` record.
//!
//! A bundle is a JSON array of records tagged by `type`. Decoding is
//! tolerant per record: an unknown or malformed entry is skipped and
//! reported, the rest still decodes.

use rh_domain::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind tag stamped on tool requests produced by the planner.
pub const TOOL_REQUEST_KIND: &str = "urn:openai_tool_request";
/// Kind tag stamped on tool results produced by the planner.
pub const TOOL_RESULT_KIND: &str = "urn:openai_tool_result";

const KNOWN_TAGS: [&str; 5] = [
    "user_turn",
    "bot_turn",
    "tool_request",
    "tool_result",
    "agent_marker",
];

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationRecord {
    UserTurn { text: String },
    BotTurn { text: String },
    ToolRequest { kind: String, payload: Value },
    ToolResult { kind: String, payload: Value },
    AgentMarker { name: String },
}

impl ConversationRecord {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserTurn { text: text.into() }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::BotTurn { text: text.into() }
    }

    pub fn tool_request(payload: Value) -> Self {
        Self::ToolRequest {
            kind: TOOL_REQUEST_KIND.into(),
            payload,
        }
    }

    pub fn tool_result(payload: Value) -> Self {
        Self::ToolResult {
            kind: TOOL_RESULT_KIND.into(),
            payload,
        }
    }

    pub fn marker(name: impl Into<String>) -> Self {
        Self::AgentMarker { name: name.into() }
    }

    /// A bot turn closes an exchange.
    pub fn closes_exchange(&self) -> bool {
        matches!(self, Self::BotTurn { .. })
    }
}

/// Result of decoding a bundle: the records in order plus whatever was
/// skipped along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedHistory {
    pub records: Vec<ConversationRecord>,
    pub skipped: Vec<ProtocolError>,
}

pub struct HistoryCodec;

impl HistoryCodec {
    /// Decode a bundle. Absent, empty and malformed bundles all yield an
    /// empty history; only the malformed case reports an error.
    pub fn decode(bundle: Option<&str>) -> DecodedHistory {
        let raw = match bundle.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return DecodedHistory::default(),
        };

        let items = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                return DecodedHistory {
                    records: Vec::new(),
                    skipped: vec![ProtocolError::MalformedBundle(format!(
                        "expected a JSON array, got {}",
                        json_kind(&other)
                    ))],
                }
            }
            Err(e) => {
                return DecodedHistory {
                    records: Vec::new(),
                    skipped: vec![ProtocolError::MalformedBundle(e.to_string())],
                }
            }
        };

        let mut decoded = DecodedHistory {
            records: Vec::with_capacity(items.len()),
            skipped: Vec::new(),
        };
        for (index, item) in items.into_iter().enumerate() {
            let tag = item
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if !KNOWN_TAGS.contains(&tag.as_str()) {
                tracing::warn!(index, tag = %tag, "skipping unrecognized history record");
                decoded.skipped.push(ProtocolError::UnrecognizedRecord(tag));
                continue;
            }
            match serde_json::from_value::<ConversationRecord>(item) {
                Ok(record) => decoded.records.push(record),
                Err(e) => {
                    tracing::warn!(index, tag = %tag, error = %e, "skipping malformed history record");
                    decoded.skipped.push(ProtocolError::MalformedRecord {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        decoded
    }

    /// Encode records in order. Callers only encode non-empty histories;
    /// an empty slice still encodes to `[]`.
    pub fn encode(records: &[ConversationRecord]) -> serde_json::Result<String> {
        serde_json::to_string(records)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
