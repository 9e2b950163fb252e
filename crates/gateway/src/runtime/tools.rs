//! The six staffing tools exposed to the planner, bound to one message.
//!
//! Every tool returns JSON. Validation and upstream failures become
//! `{"status":"error","message":…,"code":…}` results rather than errors,
//! so the model can explain them. Arguments are validated before any
//! network call.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rh_contextpack::{ContextSnapshot, SnapshotEntry};
use rh_domain::config::ResolverConfig;
use rh_domain::error::{UpstreamError, ValidationError};
use rh_domain::tool::{ToolCall, ToolDefinition};
use rh_domain::trace::TraceEvent;
use rh_resolver::{id_match, is_employee_id, EmployeeIndex};
use rh_staffing::shape::{
    decision_result, shape_leave_details, shape_leave_requests, shape_open_shifts,
    upstream_error_value,
};
use rh_staffing::{Decision, ShiftDecision, StaffingProvider};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::planner::{ToolExecutor, ToolOutput};
use super::pool::UpstreamPool;

pub const GET_SHIFT_REQUESTS: &str = "get_shift_requests";
pub const SEARCH_EMPLOYEES: &str = "search_employees";
pub const APPROVE_DENY_SHIFT: &str = "approve_deny_shift_request";
pub const GET_PTO_REQUESTS: &str = "get_pto_requests";
pub const GET_PTO_DETAILS: &str = "get_pto_request_details";
pub const APPROVE_DENY_PTO: &str = "approve_deny_pto_request";

// ── snapshot entry types ─────────────────────────────────────────────

pub const SHIFT_REQUESTS_ENTRY: &str = "Staff Request Response Data";
pub const SEARCH_ENTRY: &str = "Search Employees";
pub const PTO_REQUESTS_ENTRY: &str = "PTO Requests Response Data";
pub const PTO_DETAILS_ENTRY: &str = "PTO Request Details Data";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool definitions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn build_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_SHIFT_REQUESTS.into(),
            description: "Retrieve open shift requests submitted by employees for one date.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "date_on": { "type": "string", "description": "Date of the open shift requests (YYYY-MM-DD)" }
                },
                "required": ["date_on"]
            }),
        },
        ToolDefinition {
            name: SEARCH_EMPLOYEES.into(),
            description: "Find employees by (possibly misspelled) name or by numeric employee id. \
                          Returns candidates with a match score from 0 to 100."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "employee_search_string": { "type": "string", "description": "Employee name or id" }
                },
                "required": ["employee_search_string"]
            }),
        },
        ToolDefinition {
            name: APPROVE_DENY_SHIFT.into(),
            description: "Approve or deny one open shift request. Only requests dated today or later can be decided.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "date_on": { "type": "string", "description": "Date of the open shift request (YYYY-MM-DD)" },
                    "request_for": { "type": "string", "enum": ["Approve", "Deny"], "description": "Decision to apply" },
                    "employee_id": { "type": "integer", "description": "Employee identifier from the request" },
                    "shift_id": { "type": "integer", "description": "Shift identifier from the request" },
                    "unit_id": { "type": "integer", "description": "Unit identifier from the request" },
                    "position_id": { "type": "integer", "description": "Position identifier from the request" },
                    "message_id": { "type": "integer", "description": "Message identifier from the request" }
                },
                "required": ["date_on", "request_for", "employee_id", "shift_id", "unit_id", "position_id", "message_id"]
            }),
        },
        ToolDefinition {
            name: GET_PTO_REQUESTS.into(),
            description: "List pending PTO (leave) requests in a date range. Use the same date \
                          for start and end when only one date is given. Details come from \
                          get_pto_request_details."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_date": { "type": "string", "description": "Start of the range (YYYY-MM-DD)" },
                    "end_date": { "type": "string", "description": "End of the range (YYYY-MM-DD)" }
                },
                "required": ["start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: GET_PTO_DETAILS.into(),
            description: "Per-day details of one PTO request the user picked from the summary.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "leave_request_id": { "type": "integer", "description": "Leave request id from the summary" },
                    "employee_id": { "type": "integer", "description": "Employee id on the request" },
                    "employee_name": { "type": "string", "description": "Employee name on the request" },
                    "start_date": { "type": "string", "description": "First day of the request" },
                    "end_date": { "type": "string", "description": "Last day of the request" }
                },
                "required": ["leave_request_id", "employee_id", "employee_name", "start_date", "end_date"]
            }),
        },
        ToolDefinition {
            name: APPROVE_DENY_PTO.into(),
            description: "Approve or deny one PTO request, optionally with a comment.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "leave_request_id": { "type": "integer", "description": "Leave request id" },
                    "request_for": { "type": "string", "enum": ["Approve", "Deny"], "description": "Decision to apply" },
                    "comment": { "type": "string", "description": "Optional comment for the employee" }
                },
                "required": ["leave_request_id", "request_for"]
            }),
        },
    ]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Argument helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
enum ToolFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("could not encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolFailure {
    fn to_value(&self) -> Value {
        match self {
            ToolFailure::Validation(e) => json!({
                "status": "error",
                "message": e.to_string(),
                "code": e.code(),
            }),
            ToolFailure::Upstream(e) => upstream_error_value(e),
            ToolFailure::Encode(e) => json!({
                "status": "error",
                "message": format!("could not encode tool result: {e}"),
                "code": 500,
            }),
        }
    }
}

fn str_arg(args: &Value, name: &str) -> Result<String, ValidationError> {
    match args.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ValidationError::MissingArgument(name.to_owned())),
    }
}

fn int_arg(args: &Value, name: &str) -> Result<i64, ValidationError> {
    match args.get(name) {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| ValidationError::MissingArgument(name.to_owned())),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| ValidationError::MissingArgument(name.to_owned())),
        _ => Err(ValidationError::MissingArgument(name.to_owned())),
    }
}

fn decision_arg(args: &Value) -> Result<Decision, ValidationError> {
    let raw = str_arg(args, "request_for")?;
    Decision::parse(&raw).ok_or(ValidationError::BadAction(raw))
}

/// Parse an action date (`YYYY-MM-DD` or `MM-DD-YYYY`) and refuse dates
/// before `today`.
pub fn validate_action_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m-%d-%Y"))
        .map_err(|_| ValidationError::BadDateFormat(raw.to_owned()))?;
    if date < today {
        return Err(ValidationError::PastDate(raw.to_owned()));
    }
    Ok(date)
}

fn not_found_text(query: &str) -> String {
    format!(
        "{query} was not found in the current organization level, please search another \
         organizational level or revise your search."
    )
}

fn is_error_value(value: &Value) -> bool {
    value.get("status").and_then(Value::as_str) == Some("error")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RequestTools
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a message's tools run and what they may touch.
pub struct ToolScope {
    pub org_level_id: i64,
    pub roster_org_level_id: i64,
    pub today: NaiveDate,
    pub resolver: ResolverConfig,
}

/// Tool executor for one message. Collects snapshot entries as tools
/// succeed.
pub struct RequestTools {
    staffing: Arc<dyn StaffingProvider>,
    pool: Arc<UpstreamPool>,
    cancel: CancellationToken,
    scope: ToolScope,
    snapshot: Mutex<ContextSnapshot>,
}

impl RequestTools {
    pub fn new(
        staffing: Arc<dyn StaffingProvider>,
        pool: Arc<UpstreamPool>,
        cancel: CancellationToken,
        scope: ToolScope,
        snapshot: ContextSnapshot,
    ) -> Self {
        Self {
            staffing,
            pool,
            cancel,
            scope,
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn into_snapshot(self) -> ContextSnapshot {
        self.snapshot.into_inner()
    }

    fn remember(&self, entry_type: &str, data: Value) {
        let mut snapshot = self.snapshot.lock();
        if let Some(evicted) = snapshot.push(SnapshotEntry::new(entry_type, data)) {
            TraceEvent::SnapshotEvicted {
                entry_type: evicted.entry_type,
                capacity: snapshot.capacity(),
            }
            .emit();
        }
    }

    pub async fn dispatch_tool(&self, tool_name: &str, arguments: &Value) -> (Value, bool) {
        let outcome = match tool_name {
            GET_SHIFT_REQUESTS => self.dispatch_get_shift_requests(arguments).await,
            SEARCH_EMPLOYEES => self.dispatch_search_employees(arguments).await,
            APPROVE_DENY_SHIFT => self.dispatch_decide_shift(arguments).await,
            GET_PTO_REQUESTS => self.dispatch_get_pto_requests(arguments).await,
            GET_PTO_DETAILS => self.dispatch_get_pto_details(arguments).await,
            APPROVE_DENY_PTO => self.dispatch_decide_pto(arguments).await,
            other => {
                tracing::warn!(tool = other, "model requested an unknown tool");
                return (
                    json!({"status": "error", "message": format!("unknown tool '{other}'"), "code": 400}),
                    true,
                );
            }
        };

        match outcome {
            Ok(value) => {
                let is_error = is_error_value(&value);
                (value, is_error)
            }
            Err(failure) => {
                tracing::debug!(tool = tool_name, error = %failure, "tool failed");
                (failure.to_value(), true)
            }
        }
    }

    // ── open shifts ──────────────────────────────────────────────────

    async fn dispatch_get_shift_requests(&self, args: &Value) -> Result<Value, ToolFailure> {
        let date_on = str_arg(args, "date_on")?;
        let data = self
            .pool
            .run(
                &self.cancel,
                self.staffing.open_shift_requests(&date_on, self.scope.org_level_id),
            )
            .await?;
        let rows = Value::Array(shape_open_shifts(&date_on, data.as_ref()));
        self.remember(SHIFT_REQUESTS_ENTRY, rows.clone());
        Ok(rows)
    }

    async fn dispatch_decide_shift(&self, args: &Value) -> Result<Value, ToolFailure> {
        let date_on = str_arg(args, "date_on")?;
        validate_action_date(&date_on, self.scope.today)?;
        let decision = decision_arg(args)?;
        let request = ShiftDecision {
            date_on,
            employee_id: int_arg(args, "employee_id")?,
            shift_id: int_arg(args, "shift_id")?,
            unit_id: int_arg(args, "unit_id")?,
            position_id: int_arg(args, "position_id")?,
            message_id: int_arg(args, "message_id")?,
        };

        let outcome = self
            .pool
            .run(&self.cancel, self.staffing.decide_shift(decision, &request))
            .await;
        Ok(decision_result(outcome))
    }

    // ── employees ────────────────────────────────────────────────────

    async fn dispatch_search_employees(&self, args: &Value) -> Result<Value, ToolFailure> {
        let query = str_arg(args, "employee_search_string")?;

        let matches = if is_employee_id(&query) {
            let info = self
                .pool
                .run(&self.cancel, self.staffing.employee_short_info(&query))
                .await;
            let name = match info {
                Ok(info) => info.and_then(|i| i.display_name()),
                Err(UpstreamError::Cancelled) => return Err(UpstreamError::Cancelled.into()),
                Err(e) => {
                    tracing::debug!(error = %e, "employee lookup by id failed");
                    None
                }
            };
            id_match(&query, name)
        } else {
            let roster = self
                .pool
                .run(
                    &self.cancel,
                    self.staffing.employee_roster(self.scope.roster_org_level_id),
                )
                .await?;
            let cfg = self.scope.resolver.clone();
            let needle = query.clone();
            self.pool
                .run_blocking(&self.cancel, move || {
                    EmployeeIndex::build(&roster, &cfg).search(&needle)
                })
                .await?
        };

        if matches.is_empty() {
            return Ok(Value::String(not_found_text(&query)));
        }
        let list = serde_json::to_value(&matches)?;
        self.remember(SEARCH_ENTRY, list.clone());
        Ok(list)
    }

    // ── leave (PTO) ──────────────────────────────────────────────────

    async fn dispatch_get_pto_requests(&self, args: &Value) -> Result<Value, ToolFailure> {
        let start = str_arg(args, "start_date")?;
        let end = str_arg(args, "end_date")?;
        let data = self
            .pool
            .run(
                &self.cancel,
                self.staffing
                    .leave_requests(self.scope.org_level_id, &start, &end),
            )
            .await?;
        let rows = Value::Array(shape_leave_requests(data.as_ref()));
        self.remember(PTO_REQUESTS_ENTRY, rows.clone());
        Ok(rows)
    }

    async fn dispatch_get_pto_details(&self, args: &Value) -> Result<Value, ToolFailure> {
        let leave_request_id = int_arg(args, "leave_request_id")?;
        let data = self
            .pool
            .run(
                &self.cancel,
                self.staffing
                    .leave_request_details(self.scope.org_level_id, leave_request_id),
            )
            .await?;

        let field = |name: &str| args.get(name).cloned().unwrap_or(Value::Null);
        let detail = json!({
            "metadata": {
                "leave_request_id": leave_request_id,
                "employee_id": field("employee_id"),
                "employee_name": field("employee_name"),
                "start_date": field("start_date"),
                "end_date": field("end_date"),
            },
            "pto_request_details": shape_leave_details(data.as_ref()),
        });
        self.remember(PTO_DETAILS_ENTRY, detail.clone());
        Ok(detail)
    }

    async fn dispatch_decide_pto(&self, args: &Value) -> Result<Value, ToolFailure> {
        let leave_request_id = int_arg(args, "leave_request_id")?;
        let decision = decision_arg(args)?;
        let comment = args.get("comment").and_then(Value::as_str);

        let outcome = self
            .pool
            .run(
                &self.cancel,
                self.staffing.decide_leave(
                    self.scope.org_level_id,
                    leave_request_id,
                    decision,
                    comment,
                ),
            )
            .await;
        Ok(decision_result(outcome))
    }
}

#[async_trait]
impl ToolExecutor for RequestTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        build_tool_definitions()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let started = Instant::now();
        let (content, is_error) = self.dispatch_tool(&call.tool_name, &call.arguments).await;
        TraceEvent::ToolInvoked {
            tool_name: call.tool_name.clone(),
            is_error,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        ToolOutput { content, is_error }
    }
}
