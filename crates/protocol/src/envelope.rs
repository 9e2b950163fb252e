use std::fmt;

use rh_domain::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One typed record of an envelope. An envelope is a JSON array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnvelopeRecord {
    /// Client → server: always first; carries credential and identity.
    Intent(IntentRecord),
    /// Client → server: the operator's message.
    UserMessageContent(TextRecord),
    /// Bidirectional: answer text, or a JSON-encoded snapshot array.
    AgentMessageContent(TextRecord),
    /// Bidirectional: packed conversation history.
    HistoryContainer(HistoryRecord),
    /// Server → client: opens every reply.
    ResponseMessage(ResponseRecord),
}

const KNOWN_TYPES: [&str; 5] = [
    "Intent",
    "UserMessageContent",
    "AgentMessageContent",
    "HistoryContainer",
    "ResponseMessage",
];

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub intent_type: Option<String>,
    /// Raw bearer token. Never logged; see the `Debug` impl.
    #[serde(default, alias = "jwtEncodedString")]
    pub credential: Option<String>,
    #[serde(default, alias = "sessionID")]
    pub session_id: Option<String>,
    #[serde(default, alias = "accountURI")]
    pub account_id: Option<String>,
    #[serde(default, alias = "subjectId", alias = "userID")]
    pub login_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub org_level_id: Option<i64>,
    #[serde(default)]
    pub org_level_type: Option<String>,
}

impl fmt::Debug for IntentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentRecord")
            .field("id", &self.id)
            .field("intent_type", &self.intent_type)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("session_id", &self.session_id)
            .field("account_id", &self.account_id)
            .field("login_id", &self.login_id)
            .field("username", &self.username)
            .field("org_level_id", &self.org_level_id)
            .field("org_level_type", &self.org_level_type)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub serialized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub intent_type: String,
}

fn new_record_id() -> Option<String> {
    Some(format!("urn:uuid:{}", uuid::Uuid::new_v4()))
}

impl EnvelopeRecord {
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::AgentMessageContent(TextRecord {
            id: new_record_id(),
            text: text.into(),
        })
    }

    pub fn history(serialized: String) -> Self {
        Self::HistoryContainer(HistoryRecord {
            id: new_record_id(),
            serialized,
        })
    }

    pub fn response(intent_type: impl Into<String>) -> Self {
        Self::ResponseMessage(ResponseRecord {
            id: new_record_id(),
            intent_type: intent_type.into(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A parsed inbound envelope: the leading intent plus the remaining
/// records that could be read.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub intent: IntentRecord,
    pub records: Vec<EnvelopeRecord>,
    /// Records after the intent that were dropped while parsing.
    pub skipped: Vec<ProtocolError>,
}

impl Envelope {
    /// Parse one inbound frame.
    ///
    /// Fails only when the frame has no usable intent record; anything
    /// wrong with later records is skipped and listed in `skipped`.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let items = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                return Err(ProtocolError::MalformedRecord {
                    index: 0,
                    reason: "envelope is not a JSON array".into(),
                })
            }
            Err(e) => {
                return Err(ProtocolError::MalformedRecord {
                    index: 0,
                    reason: e.to_string(),
                })
            }
        };

        let mut items = items.into_iter();
        let first = items.next().ok_or(ProtocolError::EmptyEnvelope)?;
        let intent = match serde_json::from_value::<EnvelopeRecord>(first) {
            Ok(EnvelopeRecord::Intent(intent)) => intent,
            _ => return Err(ProtocolError::MissingIntent),
        };

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for (offset, item) in items.enumerate() {
            let index = offset + 1;
            let tag = item
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if !KNOWN_TYPES.contains(&tag.as_str()) {
                tracing::warn!(index, tag = %tag, "skipping unrecognized envelope record");
                skipped.push(ProtocolError::UnrecognizedRecord(tag));
                continue;
            }
            match serde_json::from_value::<EnvelopeRecord>(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(index, tag = %tag, error = %e, "skipping malformed envelope record");
                    skipped.push(ProtocolError::MalformedRecord {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            intent,
            records,
            skipped,
        })
    }

    /// The operator's message: the last `UserMessageContent` record.
    pub fn user_text(&self) -> Option<&str> {
        self.records.iter().rev().find_map(|r| match r {
            EnvelopeRecord::UserMessageContent(t) => Some(t.text.as_str()),
            _ => None,
        })
    }

    /// The packed history from the last `HistoryContainer` record.
    pub fn history_bundle(&self) -> Option<&str> {
        self.records.iter().rev().find_map(|r| match r {
            EnvelopeRecord::HistoryContainer(h) => Some(h.serialized.as_str()),
            _ => None,
        })
    }

    /// The resent context snapshot: the last `AgentMessageContent` whose
    /// text is a JSON array.
    pub fn snapshot_text(&self) -> Option<&str> {
        self.records.iter().rev().find_map(|r| match r {
            EnvelopeRecord::AgentMessageContent(t) if t.text.trim_start().starts_with('[') => {
                Some(t.text.as_str())
            }
            _ => None,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound envelopes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The success reply: response intent, answer, optional packed history,
/// and the snapshot as JSON text.
pub fn reply_records(
    intent_type: &str,
    answer: &str,
    history: Option<String>,
    snapshot_json: String,
) -> Vec<EnvelopeRecord> {
    let mut records = vec![
        EnvelopeRecord::response(intent_type),
        EnvelopeRecord::agent_text(answer),
    ];
    if let Some(serialized) = history {
        records.push(EnvelopeRecord::history(serialized));
    }
    records.push(EnvelopeRecord::agent_text(snapshot_json));
    records
}

/// The in-band failure reply: response intent plus one message.
pub fn error_records(intent_type: &str, message: &str) -> Vec<EnvelopeRecord> {
    vec![
        EnvelopeRecord::response(intent_type),
        EnvelopeRecord::agent_text(message),
    ]
}

pub fn to_frame(records: &[EnvelopeRecord]) -> serde_json::Result<String> {
    serde_json::to_string(records)
}
