//! System prompt assembly for the request-handling planner.
//!
//! Pure: the caller supplies "today" (already in the facility timezone),
//! the session's organization level and the current snapshot.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::snapshot::ContextSnapshot;

/// Date format shown to operators.
pub const DISPLAY_DATE: &str = "%m-%d-%Y";

/// Today's date in the given timezone.
pub fn local_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The Sunday-to-Saturday shift week containing a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWeek {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ShiftWeek {
    pub fn containing(day: NaiveDate) -> Self {
        let back = i64::from(day.weekday().num_days_from_sunday());
        let start = day - Duration::days(back);
        Self {
            start,
            end: start + Duration::days(6),
        }
    }
}

pub struct PromptBuilder<'a> {
    today: NaiveDate,
    permitted_level: &'a str,
    session_level: &'a str,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(today: NaiveDate, permitted_level: &'a str, session_level: &'a str) -> Self {
        Self {
            today,
            permitted_level,
            session_level,
        }
    }

    pub fn build(&self, snapshot: &ContextSnapshot) -> String {
        let week = ShiftWeek::containing(self.today);
        let mut prompt = String::with_capacity(4096);

        prompt.push_str(&format!(
            "## Role\n\n\
             You are the Request Handler Agent. You help healthcare facilities review, approve and \
             deny open shift requests and PTO (leave) requests. You may only approve or deny \
             requests dated today or later.\n\n\
             ## Current context\n\n\
             - Today: {today}\n\
             - Current shift week: {start} to {end} (Sunday to Saturday)\n\
             - Scope: actions are limited to the '{permitted}' level; the user is logged in at \
             '{session}'.\n\n",
            today = self.today.format(DISPLAY_DATE),
            start = week.start.format(DISPLAY_DATE),
            end = week.end.format(DISPLAY_DATE),
            permitted = self.permitted_level,
            session = self.session_level,
        ));

        prompt.push_str(
            "## Dates\n\n\
             - A bare day name (\"Monday\") means that day in the current shift week.\n\
             - \"Last Monday\" is in the week before; \"next Monday\" is in the week after.\n\
             - \"This week\", \"next week\" and \"last week\" refer to shift weeks.\n\
             - If a date and a day name disagree, ask the user to clarify.\n\
             - Use YYYY-MM-DD in tool arguments. Show dates to the user as MM-DD-YYYY.\n\
             - When the user gives no date, use today.\n\n\
             ## Tools\n\n\
             - Never invent identifiers or results; always call a tool and report what it returned.\n\
             - get_shift_requests covers a single date. Call it once per day for a range.\n\
             - Resolve people by name with search_employees before acting on them.\n\
             - Before approving or denying a PTO request, ask whether the user wants to add a comment.\n\
             - Show PTO data in full; do not drop rows or columns.\n\
             - A tool result with \"status\": \"error\" failed. Explain the message to the user.\n\
             - Ignore HTML in earlier answers; take identifiers from the context data below.\n\n\
             ## PTO flow\n\n\
             1. List requests as a table: Employee | Date Range (Count of Shifts) | Reason | Remaining Balance.\n\
             2. On request, show details as a table: Employee | Date Requested | Shift | Remaining Balance.\n\
             3. Confirm approve or deny, ask about a comment, then call approve_deny_pto_request.\n",
        );

        prompt.push_str(&context_data_section(snapshot));
        prompt
    }
}

fn context_data_section(snapshot: &ContextSnapshot) -> String {
    let labels: &[&str] = match snapshot.len() {
        0 => return String::new(),
        1 => &["Most recent data fetched"],
        2 => &["Second last data fetched", "Most recent data fetched"],
        _ => &[
            "Oldest data fetched",
            "Second last data fetched",
            "Most recent data fetched",
        ],
    };

    let skip = snapshot.len().saturating_sub(labels.len());
    let mut section = String::from(
        "\n## Context data\n\nPrior fetched request data, oldest to most recent:\n",
    );
    for (label, entry) in labels.iter().zip(snapshot.iter().skip(skip)) {
        let body = serde_json::to_string_pretty(entry).unwrap_or_default();
        section.push_str(&format!("\n### {label}\n```json\n{body}\n```\n"));
    }
    section.push_str(
        "\nIf the user refers to an index, row or name from this data, take tool arguments from it.\n",
    );
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotEntry;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shift_week_runs_sunday_to_saturday() {
        // 2026-10-17 is a Saturday.
        let week = ShiftWeek::containing(day(2026, 10, 17));
        assert_eq!(week.start, day(2026, 10, 11));
        assert_eq!(week.end, day(2026, 10, 17));

        let sunday = ShiftWeek::containing(day(2026, 10, 18));
        assert_eq!(sunday.start, day(2026, 10, 18));
        assert_eq!(sunday.end, day(2026, 10, 24));
    }

    #[test]
    fn prompt_shows_display_dates_and_scope() {
        let snap = ContextSnapshot::new(3);
        let prompt = PromptBuilder::new(day(2026, 10, 14), "Department", "Department").build(&snap);
        assert!(prompt.contains("Today: 10-14-2026"));
        assert!(prompt.contains("10-11-2026 to 10-17-2026"));
        assert!(!prompt.contains("## Context data"));
    }

    #[test]
    fn context_section_labels_follow_snapshot_length() {
        let mut snap = ContextSnapshot::new(3);
        snap.push(SnapshotEntry::new("PTO Requests Response Data", json!([1])));
        let prompt = PromptBuilder::new(day(2026, 1, 1), "Department", "Department").build(&snap);
        assert!(prompt.contains("### Most recent data fetched"));
        assert!(!prompt.contains("Second last"));

        snap.push(SnapshotEntry::new("b", json!(2)));
        snap.push(SnapshotEntry::new("c", json!(3)));
        let prompt = PromptBuilder::new(day(2026, 1, 1), "Department", "Department").build(&snap);
        let oldest = prompt.find("### Oldest data fetched").unwrap();
        let recent = prompt.find("### Most recent data fetched").unwrap();
        assert!(oldest < recent);
        assert!(prompt.contains("PTO Requests Response Data"));
    }
}
