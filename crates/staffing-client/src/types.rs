//! Data Transfer Objects for the staffing backend.
//!
//! Field names use `camelCase` on the wire (matching the .NET API) and
//! `snake_case` in Rust code. Every response is wrapped in `{"data": ...}`.
//! Nested objects are optional and default to empty so that a sparse
//! record shapes into nulls instead of failing the whole call.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"data": ...}` wrapper around every backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Caller identity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Who the backend calls are made for. Built from a validated credential
/// for exactly one inbound message.
#[derive(Clone)]
pub struct CallerIdentity {
    /// Raw bearer token, forwarded as `Authorization: Bearer`.
    pub token: String,
    /// Tenant alias (`X-Slx-Alias`).
    pub alias: String,
    /// Login of the operator (`x-slx-ms-userLogin`).
    pub login: String,
}

impl fmt::Debug for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerIdentity")
            .field("token", &"<redacted>")
            .field("alias", &self.alias)
            .field("login", &self.login)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// App settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /api/v1/app/settings: one `{key, value}` item.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSetting {
    pub key: Option<String>,
    pub value: Option<String>,
}

/// Tenant settings keyed by name.
#[derive(Debug, Clone, Default)]
pub struct AppSettings(pub HashMap<String, String>);

impl AppSettings {
    pub const MODEL_KEY: &'static str = "AzureOpenAIKey";
    pub const MODEL_ENDPOINT: &'static str = "AzureOpenAIBaseEndpoint";
    pub const MODEL_DEPLOYMENT: &'static str = "AzureOpenAIDeployment";
    pub const MODEL_API_VERSION: &'static str = "AzureOpenAIApiVersion";

    pub fn from_items(items: Vec<AppSetting>) -> Self {
        Self(
            items
                .into_iter()
                .filter_map(|s| Some((s.key?, s.value?)))
                .collect(),
        )
    }

    /// A setting, treating an empty value as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Employees
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /api/v1/employees/{id}/shortInfo
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeShortInfo {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, rename = "type")]
    pub employee_type: Option<String>,
    #[serde(default)]
    pub date_hired: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl EmployeeShortInfo {
    /// `fullName`, else "first last"; `None` when both are blank.
    pub fn display_name(&self) -> Option<String> {
        if let Some(full) = self.full_name.as_deref().map(str::trim) {
            if !full.is_empty() {
                return Some(full.to_string());
            }
        }
        let joined = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let joined = joined.trim();
        (!joined.is_empty()).then(|| joined.to_string())
    }
}

/// GET /api/v1/lookup/employees: one roster row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Open shifts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `{id, name}` reference used throughout the schedule API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
}

/// POST /api/v1/schedule/{date}/orglevel/{org}/openShift
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenShiftData {
    #[serde(default)]
    pub details: Vec<OpenShiftDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftDetail {
    #[serde(default)]
    pub shift: Option<Named>,
    #[serde(default)]
    pub shift_group: Option<Named>,
    #[serde(default)]
    pub position: Option<Named>,
    #[serde(default)]
    pub unit: Option<Named>,
    /// Request messages, passed through untouched.
    #[serde(default)]
    pub messages: Vec<Value>,
}

/// Whether a request is being approved or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    /// Case-insensitive "approve" / "deny".
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "deny" | "denied" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// POST /api/v1/messages/{messageId}/approveShift|denyShift: body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShiftDecision {
    pub date_on: String,
    pub employee_id: i64,
    pub shift_id: i64,
    pub unit_id: i64,
    pub position_id: i64,
    #[serde(skip)]
    pub message_id: i64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Leave (PTO) requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /api/v1/schedule/orglevel/{org}/leaveRequests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveRequestsData {
    #[serde(default)]
    pub requests: Vec<LeaveRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveRequest {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub employee: Option<Named>,
    #[serde(default)]
    pub department: Option<Named>,
    #[serde(default)]
    pub position: Option<Named>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub accruals: Value,
}

impl LeaveRequest {
    /// Already decided requests are not actionable.
    pub fn is_decided(&self) -> bool {
        matches!(self.status.as_deref(), Some("Approved") | Some("Denied"))
    }
}

/// GET …/leaveRequests/{id}/details
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaveDetailsData {
    #[serde(default)]
    pub details: Vec<LeaveDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDetail {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub shift: Option<ShiftInfo>,
    #[serde(default)]
    pub unit: Option<Named>,
    #[serde(default)]
    pub absence_reason: Option<AbsenceReason>,
    /// Spelled this way by the backend.
    #[serde(default, rename = "isAccruaBalanceAvailable")]
    pub accrual_balance_available: Option<bool>,
    #[serde(default)]
    pub accrual_balance: Value,
    #[serde(default)]
    pub approved_absences: Value,
    #[serde(default)]
    pub submitted_absences: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftInfo {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub duration: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbsenceReason {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
