use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The only `iss` claim accepted on inbound credentials.
    #[serde(default = "d_issuer")]
    pub expected_issuer: String,
    /// Allowed clock skew when comparing `exp` against now.
    #[serde(default)]
    pub leeway_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            expected_issuer: d_issuer(),
            leeway_secs: 0,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-message dispatch settings: scope, windowing and reply shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// The organization level type a session must be scoped to.
    #[serde(default = "d_permitted_level")]
    pub permitted_org_level: String,
    /// Intent type handled as a chat turn; others are refused in-band.
    #[serde(default = "d_chat_intent")]
    pub chat_intent_type: String,
    /// Completed user/assistant exchanges kept in the history window.
    #[serde(default = "d_history_exchanges")]
    pub history_exchanges: usize,
    /// Tool-result snapshots round-tripped to the client.
    #[serde(default = "d_snapshot_capacity")]
    pub snapshot_capacity: usize,
    /// Name stamped on the agent marker that opens each exchange.
    #[serde(default = "d_agent_name")]
    pub agent_name: String,
    /// IANA timezone used for "today" in prompts and date validation.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            permitted_org_level: d_permitted_level(),
            chat_intent_type: d_chat_intent(),
            history_exchanges: d_history_exchanges(),
            snapshot_capacity: d_snapshot_capacity(),
            agent_name: d_agent_name(),
            timezone: d_timezone(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_issuer() -> String {
    "slxx".into()
}
fn d_permitted_level() -> String {
    "Department".into()
}
fn d_chat_intent() -> String {
    "http://vital.ai/ontology/vital-aimp#AIMPIntentType_CHAT".into()
}
fn d_history_exchanges() -> usize {
    2
}
fn d_snapshot_capacity() -> usize {
    3
}
fn d_agent_name() -> String {
    "AI_Agent_RequestHandler".into()
}
fn d_timezone() -> String {
    "America/New_York".into()
}
