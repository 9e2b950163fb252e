//! `rh-staffing`: staffing backend client for the request handler.
//!
//! Provides the [`StaffingProvider`] trait that abstracts over the
//! staffing REST API, a production REST implementation
//! ([`RestStaffingClient`]) with bounded retry, typed DTOs for the
//! endpoints the request handler uses, and pure shaping helpers that
//! turn backend payloads into planner-facing JSON.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rh_domain::config::StaffingConfig;
//! use rh_staffing::{CallerIdentity, RestStaffingConnector, StaffingProvider};
//!
//! # async fn example() -> rh_domain::error::Result<()> {
//! let connector = RestStaffingConnector::new(&StaffingConfig::default())?;
//! let client = connector.client(CallerIdentity {
//!     token: "eyJ…".into(),
//!     alias: "acme".into(),
//!     login: "jdoe".into(),
//! });
//!
//! let roster = client.employee_roster(1).await?;
//! println!("{} active employees", roster.len());
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod rest;
pub mod shape;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use provider::{StaffingConnector, StaffingProvider};
pub use rest::{from_reqwest, RestStaffingClient, RestStaffingConnector};
pub use types::{
    AppSettings, CallerIdentity, Decision, EmployeeShortInfo, LeaveDetailsData,
    LeaveRequestsData, OpenShiftData, RosterEntry, ShiftDecision,
};
