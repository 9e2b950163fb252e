//! Turning backend payloads into the compact JSON handed to the planner.
//!
//! All functions here are pure; the tools in the gateway call them on
//! whatever the [`StaffingProvider`](crate::StaffingProvider) returned.

use rh_domain::error::{UpstreamError, UpstreamResult};
use serde_json::{json, Value};

use crate::types::{LeaveDetailsData, LeaveRequestsData, Named, OpenShiftData};

fn id_of(named: &Option<Named>) -> Value {
    named.as_ref().map(|n| n.id.clone()).unwrap_or(Value::Null)
}

fn name_of(named: &Option<Named>) -> Value {
    named
        .as_ref()
        .and_then(|n| n.name.clone())
        .map(Value::String)
        .unwrap_or(Value::Null)
}

// ── open shifts ──────────────────────────────────────────────────────

/// One row per request message. Details with no messages are skipped.
pub fn shape_open_shifts(date_on: &str, data: Option<&OpenShiftData>) -> Vec<Value> {
    let Some(data) = data else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for detail in &data.details {
        if detail.messages.is_empty() {
            continue;
        }
        let metadata = json!({
            "request date": date_on,
            "shift_id": id_of(&detail.shift),
            "shift_name": name_of(&detail.shift),
            "shift_group_id": id_of(&detail.shift_group),
            "shift_group_name": name_of(&detail.shift_group),
            "position_id": id_of(&detail.position),
            "position_name": name_of(&detail.position),
            "unit_id": id_of(&detail.unit),
            "unit_name": name_of(&detail.unit),
        });
        for message in &detail.messages {
            rows.push(json!({
                "metadata": metadata,
                "request messages": message,
            }));
        }
    }
    rows
}

// ── leave (PTO) ──────────────────────────────────────────────────────

/// Pending requests only; approved and denied ones are dropped.
pub fn shape_leave_requests(data: Option<&LeaveRequestsData>) -> Vec<Value> {
    let Some(data) = data else {
        return Vec::new();
    };

    data.requests
        .iter()
        .filter(|r| !r.is_decided())
        .map(|r| {
            json!({
                "leave_request_id": r.id,
                "employee_id": id_of(&r.employee),
                "employee_name": name_of(&r.employee),
                "department_id": id_of(&r.department),
                "department_name": name_of(&r.department),
                "position_id": id_of(&r.position),
                "position_name": name_of(&r.position),
                "start": r.start,
                "end": r.end,
                "reason": r.reason,
                "status": r.status,
                "accruals": r.accruals,
            })
        })
        .collect()
}

pub fn shape_leave_details(data: Option<&LeaveDetailsData>) -> Vec<Value> {
    let Some(data) = data else {
        return Vec::new();
    };

    data.details
        .iter()
        .map(|d| {
            let shift = d.shift.as_ref();
            let reason = d.absence_reason.as_ref();
            json!({
                "date": d.date,
                "shift_id": shift.map(|s| s.id.clone()).unwrap_or(Value::Null),
                "shift_name": shift.and_then(|s| s.name.clone()),
                "shift_start": shift.and_then(|s| s.start.clone()),
                "shift_end": shift.and_then(|s| s.end.clone()),
                "shift_duration": shift.map(|s| s.duration.clone()).unwrap_or(Value::Null),
                "unit_id": id_of(&d.unit),
                "unit_name": name_of(&d.unit),
                "absence_code": reason.and_then(|r| r.code.clone()),
                "absence_description": reason.and_then(|r| r.description.clone()),
                "isAccruaBalanceAvailable": d.accrual_balance_available,
                "accrualBalance": d.accrual_balance,
                "approvedAbsences": d.approved_absences,
                "submittedAbsences": d.submitted_absences,
            })
        })
        .collect()
}

// ── decisions and errors ─────────────────────────────────────────────

/// `{"status":"error","message":…,"code":…}`
pub fn upstream_error_value(err: &UpstreamError) -> Value {
    let message = match err {
        UpstreamError::HttpStatus { body, .. } if !body.trim().is_empty() => body.clone(),
        other => other.to_string(),
    };
    json!({
        "status": "error",
        "message": message,
        "code": err.code(),
    })
}

/// Result of an approve/deny call. A 204 (no body) is still a success.
pub fn decision_result(outcome: UpstreamResult<Option<Value>>) -> Value {
    match outcome {
        Ok(data) => json!({
            "status": "success",
            "data": data.unwrap_or(Value::Null),
        }),
        Err(e) => upstream_error_value(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_shifts() -> OpenShiftData {
        serde_json::from_value(json!({
            "details": [
                {
                    "shift": {"id": 11, "name": "7a-7p"},
                    "shiftGroup": {"id": 2, "name": "Day"},
                    "position": {"id": 5, "name": "RN"},
                    "unit": {"id": 9, "name": "ICU"},
                    "messages": [{"id": 100}, {"id": 101}]
                },
                {
                    "shift": {"id": 12, "name": "7p-7a"},
                    "messages": []
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn open_shifts_emit_one_row_per_message() {
        let rows = shape_open_shifts("2026-10-20", Some(&open_shifts()));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["metadata"]["request date"], "2026-10-20");
        assert_eq!(rows[0]["metadata"]["unit_name"], "ICU");
        assert_eq!(rows[1]["request messages"]["id"], 101);
    }

    #[test]
    fn missing_nested_objects_shape_to_null() {
        let data: OpenShiftData =
            serde_json::from_value(json!({"details": [{"messages": [1]}]})).unwrap();
        let rows = shape_open_shifts("2026-10-20", Some(&data));
        assert_eq!(rows[0]["metadata"]["shift_id"], Value::Null);
        assert_eq!(rows[0]["metadata"]["position_name"], Value::Null);
    }

    #[test]
    fn decided_leave_requests_are_dropped() {
        let data: LeaveRequestsData = serde_json::from_value(json!({
            "requests": [
                {"id": 1, "status": "Pending", "employee": {"id": 7, "name": "Ann Lee"}},
                {"id": 2, "status": "Approved"},
                {"id": 3, "status": "Denied"},
                {"id": 4, "status": "Submitted"}
            ]
        }))
        .unwrap();
        let rows = shape_leave_requests(Some(&data));
        let ids: Vec<_> = rows.iter().map(|r| r["leave_request_id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(4)]);
        assert_eq!(rows[0]["employee_name"], "Ann Lee");
    }

    #[test]
    fn leave_details_keep_backend_balance_names() {
        let data: LeaveDetailsData = serde_json::from_value(json!({
            "details": [{
                "date": "2026-10-21",
                "shift": {"id": 3, "name": "Day", "start": "07:00", "end": "19:00", "duration": 12},
                "absenceReason": {"code": "PTO", "description": "Paid time off"},
                "isAccruaBalanceAvailable": true,
                "accrualBalance": 40
            }]
        }))
        .unwrap();
        let rows = shape_leave_details(Some(&data));
        assert_eq!(rows[0]["shift_duration"], 12);
        assert_eq!(rows[0]["absence_code"], "PTO");
        assert_eq!(rows[0]["isAccruaBalanceAvailable"], true);
        assert_eq!(rows[0]["accrualBalance"], 40);
    }

    #[test]
    fn no_content_decision_is_success() {
        assert_eq!(
            decision_result(Ok(None)),
            json!({"status": "success", "data": null})
        );
    }

    #[test]
    fn failed_decision_reports_status_and_body() {
        let err = UpstreamError::HttpStatus {
            status: 409,
            body: "already processed".into(),
        };
        assert_eq!(
            decision_result(Err(err)),
            json!({"status": "error", "message": "already processed", "code": 409})
        );
    }

    #[test]
    fn exhausted_retries_report_last_status() {
        let err = UpstreamError::RetriesExhausted {
            attempts: 3,
            last_status: Some(502),
            last: "HTTP 502".into(),
        };
        assert_eq!(upstream_error_value(&err)["code"], 502);
    }
}
