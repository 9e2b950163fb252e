use serde::Serialize;

/// Structured trace events emitted across the request-handler crates.
///
/// Events never carry credentials or message text; identifiers and
/// counts only.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    MessageReceived {
        connection_id: String,
        bytes: usize,
    },
    MessageDispatched {
        session_id: String,
        outcome: String,
        final_state: String,
        duration_ms: u64,
    },
    HistoryWindowed {
        session_id: String,
        records_in: usize,
        records_out: usize,
        exchanges_dropped: usize,
    },
    SnapshotEvicted {
        entry_type: String,
        capacity: usize,
    },
    StaffingCall {
        endpoint: String,
        status: u16,
        attempts: u32,
        duration_ms: u64,
    },
    ResolverQuery {
        numeric: bool,
        roster_size: usize,
        candidates: usize,
        returned: usize,
    },
    ToolInvoked {
        tool_name: String,
        is_error: bool,
        duration_ms: u64,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "rh_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::ResolverQuery {
            numeric: false,
            roster_size: 12,
            candidates: 3,
            returned: 2,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "ResolverQuery");
        assert_eq!(v["candidates"], 3);
    }
}
