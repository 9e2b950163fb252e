use rh_domain::tool::Message;
use rh_protocol::ConversationRecord;

/// What a windowing pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowReport {
    /// Completed exchanges found in the input.
    pub exchanges_seen: usize,
    pub exchanges_dropped: usize,
    /// Records removed from the front with the dropped exchanges.
    pub records_dropped: usize,
    /// Records after the last bot turn (an unfinished exchange) that
    /// were not carried.
    pub trailing_dropped: usize,
}

/// Keep only the `keep` most recent completed exchanges.
///
/// An exchange ends at a `BotTurn`; every record since the previous
/// `BotTurn` (agent marker, user turn, tool requests and results) belongs
/// to it. Older exchanges are removed whole from the front using their
/// recorded sizes, so interleaved tool records never shift the cut.
/// Applying the window to its own output changes nothing.
pub fn window_exchanges(
    records: &[ConversationRecord],
    keep: usize,
) -> (Vec<ConversationRecord>, WindowReport) {
    let mut sizes: Vec<usize> = Vec::new();
    let mut current = 0usize;
    for record in records {
        current += 1;
        if record.closes_exchange() {
            sizes.push(current);
            current = 0;
        }
    }

    let completed_len = records.len() - current;
    let excess = sizes.len().saturating_sub(keep);
    let records_dropped: usize = sizes[..excess].iter().sum();

    let report = WindowReport {
        exchanges_seen: sizes.len(),
        exchanges_dropped: excess,
        records_dropped,
        trailing_dropped: current,
    };
    (records[records_dropped..completed_len].to_vec(), report)
}

/// Render the user and bot turns of a window as planner messages. Tool
/// records and markers stay in the packed history only.
pub fn prompt_turns(records: &[ConversationRecord]) -> Vec<Message> {
    records
        .iter()
        .filter_map(|r| match r {
            ConversationRecord::UserTurn { text } => Some(Message::user(text.as_str())),
            ConversationRecord::BotTurn { text } => Some(Message::assistant(text.as_str())),
            _ => None,
        })
        .collect()
}
