//! REST implementation of [`StaffingProvider`].
//!
//! `RestStaffingClient` wraps a shared `reqwest::Client` and translates
//! every trait method into the corresponding HTTP call against the
//! staffing backend, with bounded retry + exponential back-off on
//! transient (429 / 5xx / connection) failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use rh_domain::config::StaffingConfig;
use rh_domain::error::{Error, Result, UpstreamError, UpstreamResult};
use rh_domain::trace::TraceEvent;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::provider::{StaffingConnector, StaffingProvider};
use crate::types::{
    ApiEnvelope, AppSetting, AppSettings, CallerIdentity, Decision, EmployeeShortInfo,
    LeaveDetailsData, LeaveRequestsData, OpenShiftData, RosterEntry, ShiftDecision,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connector
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-wide factory for per-caller REST clients.
///
/// Holds the one `reqwest::Client` (and so the one connection pool) that
/// every per-message client shares.
#[derive(Debug, Clone)]
pub struct RestStaffingConnector {
    http: Client,
    base_url: String,
    max_attempts: u32,
    backoff: Duration,
}

impl RestStaffingConnector {
    pub fn new(cfg: &StaffingConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.backoff_ms),
        })
    }

    /// A client bound to one caller.
    pub fn client(&self, identity: CallerIdentity) -> RestStaffingClient {
        RestStaffingClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            identity,
            max_attempts: self.max_attempts,
            backoff: self.backoff,
        }
    }
}

impl StaffingConnector for RestStaffingConnector {
    fn connect(&self, identity: CallerIdentity) -> Result<Arc<dyn StaffingProvider>> {
        Ok(Arc::new(self.client(identity)))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the staffing backend, bound to one caller.
#[derive(Debug, Clone)]
pub struct RestStaffingClient {
    http: Client,
    base_url: String,
    identity: CallerIdentity,
    max_attempts: u32,
    backoff: Duration,
}

impl RestStaffingClient {
    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the caller's headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.identity.token)
            .header("X-Slx-Alias", &self.identity.alias)
            .header("x-slx-ms-userLogin", &self.identity.login)
            .header("Content-Type", "application/json")
    }

    /// Build the full URL for a path like `/api/v1/app/settings`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient errors.
    ///
    /// * Retries on 429/500/502/503/504, timeouts and connection failures.
    /// * Does **not** retry any other status (returned as `HttpStatus`).
    /// * Emits a `TraceEvent::StaffingCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> UpstreamResult<Response> {
        let mut last_status: Option<u16> = None;
        let mut last = String::from("no attempt made");

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = self.backoff * 2u32.pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    TraceEvent::StaffingCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        attempts: attempt + 1,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_success() {
                        return Ok(resp);
                    }

                    let body = resp.text().await.unwrap_or_default();
                    let err = UpstreamError::HttpStatus { status, body };
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(endpoint, status, attempt = attempt + 1, "transient status, retrying");
                    last_status = Some(status);
                    last = err.to_string();
                }
                Err(e) => {
                    TraceEvent::StaffingCall {
                        endpoint: endpoint.to_owned(),
                        status: 0,
                        attempts: attempt + 1,
                        duration_ms,
                    }
                    .emit();

                    let err = from_reqwest(e);
                    tracing::warn!(endpoint, error = %err, attempt = attempt + 1, "request failed, retrying");
                    last = err.to_string();
                }
            }
        }

        Err(UpstreamError::RetriesExhausted {
            attempts: self.max_attempts,
            last_status,
            last,
        })
    }

    /// Read a `{"data": ...}` body.
    async fn read_data<T: DeserializeOwned>(
        endpoint: &str,
        resp: Response,
    ) -> UpstreamResult<Option<T>> {
        let body = resp.text().await.map_err(from_reqwest)?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            UpstreamError::Decode(format!("{endpoint}: {e}"))
        })?;
        Ok(envelope.data)
    }

    /// Decision endpoints: the JSON body on 200, `None` on 204 or an
    /// empty body.
    async fn read_decision(resp: Response) -> UpstreamResult<Option<Value>> {
        let body = resp.text().await.map_err(from_reqwest)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_str(&body).unwrap_or(Value::String(body)),
        ))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl StaffingProvider for RestStaffingClient {
    async fn app_settings(&self) -> UpstreamResult<AppSettings> {
        let endpoint = "GET /api/v1/app/settings";
        let url = self.url("/api/v1/app/settings");
        let resp = self
            .execute_with_retry(endpoint, || self.http.get(&url))
            .await?;
        let items: Option<Vec<AppSetting>> = Self::read_data(endpoint, resp).await?;
        Ok(AppSettings::from_items(items.unwrap_or_default()))
    }

    async fn employee_short_info(
        &self,
        employee_id: &str,
    ) -> UpstreamResult<Option<EmployeeShortInfo>> {
        let endpoint = "GET /api/v1/employees/{id}/shortInfo";
        let url = self.url(&format!("/api/v1/employees/{employee_id}/shortInfo"));
        match self.execute_with_retry(endpoint, || self.http.get(&url)).await {
            Ok(resp) => Self::read_data(endpoint, resp).await,
            Err(UpstreamError::HttpStatus { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn employee_roster(&self, org_level_id: i64) -> UpstreamResult<Vec<RosterEntry>> {
        let endpoint = "GET /api/v1/lookup/employees";
        let url = self.url("/api/v1/lookup/employees");
        let org = org_level_id.to_string();
        let resp = self
            .execute_with_retry(endpoint, || {
                self.http
                    .get(&url)
                    .query(&[("orgLevelId", org.as_str()), ("isActive", "true")])
            })
            .await?;
        let roster: Option<Vec<RosterEntry>> = Self::read_data(endpoint, resp).await?;
        Ok(roster.unwrap_or_default())
    }

    async fn open_shift_requests(
        &self,
        date_on: &str,
        org_level_id: i64,
    ) -> UpstreamResult<Option<OpenShiftData>> {
        let endpoint = "POST /api/v1/schedule/{date}/orglevel/{org}/openShift";
        let url = self.url(&format!(
            "/api/v1/schedule/{date_on}/orglevel/{org_level_id}/openShift"
        ));
        let resp = self
            .execute_with_retry(endpoint, || self.http.post(&url))
            .await?;
        Self::read_data(endpoint, resp).await
    }

    async fn decide_shift(
        &self,
        decision: Decision,
        request: &ShiftDecision,
    ) -> UpstreamResult<Option<Value>> {
        let action = match decision {
            Decision::Approve => "approveShift",
            Decision::Deny => "denyShift",
        };
        let endpoint = format!("POST /api/v1/messages/{{id}}/{action}");
        let url = self.url(&format!(
            "/api/v1/messages/{}/{action}",
            request.message_id
        ));
        let resp = self
            .execute_with_retry(&endpoint, || self.http.post(&url).json(request))
            .await?;
        Self::read_decision(resp).await
    }

    async fn leave_requests(
        &self,
        org_level_id: i64,
        start_date: &str,
        end_date: &str,
    ) -> UpstreamResult<Option<LeaveRequestsData>> {
        let endpoint = "GET /api/v1/schedule/orglevel/{org}/leaveRequests";
        let url = self.url(&format!(
            "/api/v1/schedule/orglevel/{org_level_id}/leaveRequests"
        ));
        let resp = self
            .execute_with_retry(endpoint, || {
                self.http
                    .get(&url)
                    .query(&[("startDate", start_date), ("endDate", end_date)])
            })
            .await?;
        Self::read_data(endpoint, resp).await
    }

    async fn leave_request_details(
        &self,
        org_level_id: i64,
        leave_request_id: i64,
    ) -> UpstreamResult<Option<LeaveDetailsData>> {
        let endpoint = "GET /api/v1/schedule/orglevel/{org}/leaveRequests/{id}/details";
        let url = self.url(&format!(
            "/api/v1/schedule/orglevel/{org_level_id}/leaveRequests/{leave_request_id}/details"
        ));
        let resp = self
            .execute_with_retry(endpoint, || self.http.get(&url))
            .await?;
        Self::read_data(endpoint, resp).await
    }

    async fn decide_leave(
        &self,
        org_level_id: i64,
        leave_request_id: i64,
        decision: Decision,
        comment: Option<&str>,
    ) -> UpstreamResult<Option<Value>> {
        let action = match decision {
            Decision::Approve => "approve",
            Decision::Deny => "deny",
        };
        let endpoint = format!("POST /api/v1/schedule/orglevel/{{org}}/leaveRequests/{{id}}/{action}");
        let url = self.url(&format!(
            "/api/v1/schedule/orglevel/{org_level_id}/leaveRequests/{leave_request_id}/{action}"
        ));
        let body = match comment.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => serde_json::json!({ "comment": c }),
            None => serde_json::json!({}),
        };
        let resp = self
            .execute_with_retry(&endpoint, || self.http.post(&url).json(&body))
            .await?;
        Self::read_decision(resp).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into an [`UpstreamError`].
///
/// Timeouts become `Timeout`; everything else becomes `Transport`.
pub fn from_reqwest(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(e.to_string())
    } else {
        UpstreamError::Transport(e.to_string())
    }
}
