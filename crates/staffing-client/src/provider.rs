//! The `StaffingProvider` trait defines the staffing backend operations
//! the gateway depends on (REST, mock/test).

use std::sync::Arc;

use async_trait::async_trait;
use rh_domain::error::{Result, UpstreamResult};
use serde_json::Value;

use crate::types::{
    AppSettings, CallerIdentity, Decision, EmployeeShortInfo, LeaveDetailsData,
    LeaveRequestsData, OpenShiftData, RosterEntry, ShiftDecision,
};

/// Abstraction over the staffing backend API surface, bound to one caller.
///
/// Methods return `Ok(None)` when the backend answers with an empty
/// `data` payload. Decision calls return the response body, or `None` for
/// `204 No Content`.
#[async_trait]
pub trait StaffingProvider: Send + Sync {
    /// Tenant settings (GET /api/v1/app/settings).
    async fn app_settings(&self) -> UpstreamResult<AppSettings>;

    /// One employee (GET /api/v1/employees/{id}/shortInfo). `None` when
    /// the employee does not exist.
    async fn employee_short_info(
        &self,
        employee_id: &str,
    ) -> UpstreamResult<Option<EmployeeShortInfo>>;

    /// Active employees under an org level (GET /api/v1/lookup/employees).
    async fn employee_roster(
        &self,
        org_level_id: i64,
    ) -> UpstreamResult<Vec<RosterEntry>>;

    /// Open-shift requests for one date
    /// (POST /api/v1/schedule/{date}/orglevel/{org}/openShift).
    async fn open_shift_requests(
        &self,
        date_on: &str,
        org_level_id: i64,
    ) -> UpstreamResult<Option<OpenShiftData>>;

    /// Approve or deny an open-shift request
    /// (POST /api/v1/messages/{id}/approveShift|denyShift).
    async fn decide_shift(
        &self,
        decision: Decision,
        request: &ShiftDecision,
    ) -> UpstreamResult<Option<Value>>;

    /// Leave requests in a date range
    /// (GET /api/v1/schedule/orglevel/{org}/leaveRequests).
    async fn leave_requests(
        &self,
        org_level_id: i64,
        start_date: &str,
        end_date: &str,
    ) -> UpstreamResult<Option<LeaveRequestsData>>;

    /// Per-day breakdown of one leave request (GET …/leaveRequests/{id}/details).
    async fn leave_request_details(
        &self,
        org_level_id: i64,
        leave_request_id: i64,
    ) -> UpstreamResult<Option<LeaveDetailsData>>;

    /// Approve or deny a leave request (POST …/leaveRequests/{id}/approve|deny).
    async fn decide_leave(
        &self,
        org_level_id: i64,
        leave_request_id: i64,
        decision: Decision,
        comment: Option<&str>,
    ) -> UpstreamResult<Option<Value>>;
}

/// Builds a provider bound to one caller's credentials.
///
/// The connector is shared process-wide; the providers it returns live
/// for a single inbound message.
pub trait StaffingConnector: Send + Sync {
    fn connect(&self, identity: CallerIdentity) -> Result<Arc<dyn StaffingProvider>>;
}
