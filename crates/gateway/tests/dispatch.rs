//! End-to-end dispatch tests: a real [`Dispatcher`] wired through
//! `bootstrap::build_with`, with an in-memory staffing backend and a
//! scripted planner standing in for the model.
//!
//! Covers:
//! - scope refusal before any backend traffic
//! - malformed credentials closing the connection
//! - claim failures answered in-band
//! - the happy path: answer, packed history and snapshot
//! - past-date decisions refused without a backend call
//! - cancellation producing no reply
//! - missing model settings

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use rh_domain::config::Config;
use rh_domain::error::{Result, UpstreamResult};
use rh_domain::tool::ToolCall;
use rh_gateway::bootstrap;
use rh_gateway::dispatch::{Outcome, CLOSE_UNAUTHENTICATED, MISSING_MODEL_SETTINGS};
use rh_gateway::runtime::{
    PlanError, PlanInput, PlanOutput, Planner, PlannerFactory, PlannerSetupError, ToolExecutor,
    ToolStep, UpstreamPool,
};
use rh_gateway::state::AppState;
use rh_protocol::{ConversationRecord, HistoryCodec};
use rh_staffing::{
    AppSettings, CallerIdentity, Decision, EmployeeShortInfo, LeaveDetailsData,
    LeaveRequestsData, OpenShiftData, RosterEntry, ShiftDecision, StaffingConnector,
    StaffingProvider,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const CHAT: &str = "http://vital.ai/ontology/vital-aimp#AIMPIntentType_CHAT";

// ── In-memory staffing backend ──────────────────────────────────────────

#[derive(Default)]
struct Backend {
    connects: AtomicUsize,
    calls: AtomicUsize,
    logins: Mutex<Vec<String>>,
}

impl Backend {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeStaffing(Arc<Backend>);

#[async_trait]
impl StaffingProvider for FakeStaffing {
    async fn app_settings(&self) -> UpstreamResult<AppSettings> {
        self.0.hit();
        Ok(AppSettings::default())
    }

    async fn employee_short_info(
        &self,
        _employee_id: &str,
    ) -> UpstreamResult<Option<EmployeeShortInfo>> {
        self.0.hit();
        Ok(None)
    }

    async fn employee_roster(&self, _org_level_id: i64) -> UpstreamResult<Vec<RosterEntry>> {
        self.0.hit();
        Ok(Vec::new())
    }

    async fn open_shift_requests(
        &self,
        _date_on: &str,
        _org_level_id: i64,
    ) -> UpstreamResult<Option<OpenShiftData>> {
        self.0.hit();
        let data: OpenShiftData = serde_json::from_value(json!({
            "details": [{
                "shift": {"id": 11, "name": "7a-7p"},
                "shiftGroup": {"id": 2, "name": "Day"},
                "position": {"id": 5, "name": "RN"},
                "unit": {"id": 9, "name": "ICU"},
                "messages": [{"messageId": 77, "employeeId": 1234, "employeeName": "Jordan Lee"}]
            }]
        }))
        .unwrap();
        Ok(Some(data))
    }

    async fn decide_shift(
        &self,
        _decision: Decision,
        _request: &ShiftDecision,
    ) -> UpstreamResult<Option<Value>> {
        self.0.hit();
        Ok(None)
    }

    async fn leave_requests(
        &self,
        _org_level_id: i64,
        _start_date: &str,
        _end_date: &str,
    ) -> UpstreamResult<Option<LeaveRequestsData>> {
        self.0.hit();
        Ok(None)
    }

    async fn leave_request_details(
        &self,
        _org_level_id: i64,
        _leave_request_id: i64,
    ) -> UpstreamResult<Option<LeaveDetailsData>> {
        self.0.hit();
        Ok(None)
    }

    async fn decide_leave(
        &self,
        _org_level_id: i64,
        _leave_request_id: i64,
        _decision: Decision,
        _comment: Option<&str>,
    ) -> UpstreamResult<Option<Value>> {
        self.0.hit();
        Ok(None)
    }
}

struct FakeConnector(Arc<Backend>);

impl StaffingConnector for FakeConnector {
    fn connect(&self, identity: CallerIdentity) -> Result<Arc<dyn StaffingProvider>> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        self.0.logins.lock().push(identity.login);
        Ok(Arc::new(FakeStaffing(self.0.clone())))
    }
}

// ── Scripted planner ────────────────────────────────────────────────────

/// Runs a fixed list of tool calls, then answers with fixed text.
struct ScriptedPlanner {
    calls: Vec<(&'static str, Value)>,
    answer: &'static str,
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(
        &self,
        _input: PlanInput,
        tools: &dyn ToolExecutor,
        cancel: &CancellationToken,
    ) -> std::result::Result<PlanOutput, PlanError> {
        let mut steps = Vec::new();
        for (i, (name, args)) in self.calls.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PlanError::Cancelled);
            }
            let call = ToolCall {
                call_id: format!("call_{i}"),
                tool_name: (*name).to_string(),
                arguments: args.clone(),
            };
            let out = tools.execute(&call).await;
            steps.push(ToolStep {
                call,
                result: out.content,
            });
        }
        Ok(PlanOutput {
            answer: self.answer.to_string(),
            steps,
        })
    }
}

enum Script {
    Plan(Vec<(&'static str, Value)>, &'static str),
    NoModel,
}

struct ScriptedFactory(Script);

#[async_trait]
impl PlannerFactory for ScriptedFactory {
    async fn planner(
        &self,
        _staffing: Arc<dyn StaffingProvider>,
        _pool: &UpstreamPool,
        _cancel: &CancellationToken,
    ) -> std::result::Result<Arc<dyn Planner>, PlannerSetupError> {
        match &self.0 {
            Script::Plan(calls, answer) => Ok(Arc::new(ScriptedPlanner {
                calls: calls.clone(),
                answer: *answer,
            })),
            Script::NoModel => Err(PlannerSetupError::MissingModelSettings),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn state_with(script: Script) -> (AppState, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let state = bootstrap::build_with(
        Arc::new(Config::default()),
        Arc::new(FakeConnector(backend.clone())),
        Arc::new(ScriptedFactory(script)),
    )
    .unwrap();
    (state, backend)
}

fn token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

fn valid_token() -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    token(json!({"iss": "slxx", "alias": "acme", "subjectId": "jdoe", "exp": exp}))
}

fn intent(credential: &str, level: &str) -> Value {
    json!({
        "type": "Intent",
        "intentType": CHAT,
        "jwtEncodedString": credential,
        "sessionId": "sess-1",
        "accountId": "acct-1",
        "subjectId": "jdoe",
        "username": "jdoe",
        "orgLevelId": 42,
        "orgLevelType": level
    })
}

fn envelope(credential: &str, level: &str, text: &str) -> String {
    json!([
        intent(credential, level),
        {"type": "UserMessageContent", "text": text}
    ])
    .to_string()
}

fn reply_records(outcome: Outcome) -> Vec<Value> {
    match outcome {
        Outcome::Reply(frame) => serde_json::from_str(&frame).unwrap(),
        other => panic!("expected a reply, got {other:?}"),
    }
}

fn agent_texts(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .filter(|r| r["type"] == "AgentMessageContent")
        .map(|r| r["text"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn facility_scope_is_refused_before_any_backend_call() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let raw = envelope(&valid_token(), "Facility", "show open shifts");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(records[0]["type"], "ResponseMessage");
    let texts = agent_texts(&records);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Department"), "{}", texts[0]);
    assert_eq!(backend.connects(), 0);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn malformed_credential_closes_the_connection() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let raw = envelope("not-a-token", "Department", "hello");

    let outcome = state.dispatcher.handle(&raw, &CancellationToken::new()).await;

    match outcome {
        Outcome::Close { code, reason } => {
            assert_eq!(code, CLOSE_UNAUTHENTICATED);
            let reason: Value = serde_json::from_str(&reason).unwrap();
            assert_eq!(reason["code"], 401);
        }
        other => panic!("expected close, got {other:?}"),
    }
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn envelope_without_intent_closes_the_connection() {
    let (state, _backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let raw = json!([{"type": "UserMessageContent", "text": "hi"}]).to_string();

    let outcome = state.dispatcher.handle(&raw, &CancellationToken::new()).await;
    assert!(matches!(outcome, Outcome::Close { code: CLOSE_UNAUTHENTICATED, .. }));
}

#[tokio::test]
async fn expired_credential_is_answered_in_band() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let expired = token(json!({
        "iss": "slxx", "alias": "acme", "subjectId": "jdoe",
        "exp": chrono::Utc::now().timestamp() - 60
    }));
    let raw = envelope(&expired, "Department", "hello");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(agent_texts(&records), vec!["Error: Unauthenticated. Expired token."]);
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn non_string_issuer_is_answered_in_band() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let odd = token(json!({
        "iss": 17, "alias": "acme", "subjectId": "jdoe",
        "exp": chrono::Utc::now().timestamp() + 60
    }));
    let raw = envelope(&odd, "Department", "hello");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(agent_texts(&records), vec!["Error: Unauthenticated request."]);
    assert_eq!(backend.connects(), 0);
}

#[tokio::test]
async fn numeric_user_id_reaches_the_backend_as_login() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "Hello."));
    let numeric = token(json!({
        "iss": "slxx", "alias": "acme", "user_id": 4021,
        "exp": chrono::Utc::now().timestamp() + 60
    }));
    let raw = envelope(&numeric, "Department", "hello");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(records[1]["text"], "Hello.");
    assert_eq!(*backend.logins.lock(), vec!["4021".to_string()]);
}

#[tokio::test]
async fn happy_path_returns_answer_history_and_snapshot() {
    let (state, backend) = state_with(Script::Plan(
        vec![("get_shift_requests", json!({"date_on": "2030-01-01"}))],
        "There is one open shift request for the ICU.",
    ));
    let raw = envelope(&valid_token(), "Department", "any open shift requests on Jan 1 2030?");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(records[0]["type"], "ResponseMessage");
    assert_eq!(records[0]["intentType"], CHAT);
    assert_eq!(
        records[1]["text"],
        "There is one open shift request for the ICU."
    );

    // Packed history: marker, user, tool request, tool result, bot.
    let bundle = records
        .iter()
        .find(|r| r["type"] == "HistoryContainer")
        .and_then(|r| r["serialized"].as_str())
        .expect("history container");
    let history = HistoryCodec::decode(Some(bundle));
    assert!(history.skipped.is_empty());
    assert_eq!(history.records.len(), 5);
    assert!(matches!(history.records[0], ConversationRecord::AgentMarker { .. }));
    assert!(matches!(history.records[2], ConversationRecord::ToolRequest { .. }));
    assert!(history.records[4].closes_exchange());

    // Snapshot travels as the last agent text.
    let texts = agent_texts(&records);
    let snapshot: Vec<Value> = serde_json::from_str(texts.last().unwrap()).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0]["type"], "Staff Request Response Data");
    assert_eq!(snapshot[0]["data"][0]["metadata"]["unit_name"], "ICU");

    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.calls(), 1);
    assert_eq!(*backend.logins.lock(), vec!["jdoe".to_string()]);
}

#[tokio::test]
async fn history_is_rewindowed_to_the_last_exchanges() {
    let (state, _backend) = state_with(Script::Plan(Vec::new(), "third answer"));
    let prior = HistoryCodec::encode(&[
        ConversationRecord::marker("AI_Agent_RequestHandler"),
        ConversationRecord::user("first"),
        ConversationRecord::bot("first answer"),
        ConversationRecord::marker("AI_Agent_RequestHandler"),
        ConversationRecord::user("second"),
        ConversationRecord::bot("second answer"),
    ])
    .unwrap();
    let raw = json!([
        intent(&valid_token(), "Department"),
        {"type": "HistoryContainer", "serialized": prior},
        {"type": "UserMessageContent", "text": "third"}
    ])
    .to_string();

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);
    let bundle = records
        .iter()
        .find(|r| r["type"] == "HistoryContainer")
        .and_then(|r| r["serialized"].as_str())
        .expect("history container");
    let history = HistoryCodec::decode(Some(bundle)).records;

    let users: Vec<&str> = history
        .iter()
        .filter_map(|r| match r {
            ConversationRecord::UserTurn { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(users, vec!["second", "third"]);
}

#[tokio::test]
async fn past_date_decision_makes_no_backend_call() {
    let (state, backend) = state_with(Script::Plan(
        vec![(
            "approve_deny_shift_request",
            json!({
                "date_on": "2000-01-01",
                "request_for": "approve",
                "employee_id": 1234,
                "shift_id": 11,
                "unit_id": 9,
                "position_id": 5,
                "message_id": 77
            }),
        )],
        "That date is in the past.",
    ));
    let raw = envelope(&valid_token(), "Department", "approve it for Jan 1 2000");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);

    assert_eq!(records[1]["text"], "That date is in the past.");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn cancelled_message_produces_no_reply() {
    let (state, backend) = state_with(Script::Plan(
        vec![("get_shift_requests", json!({"date_on": "2030-01-01"}))],
        "unused",
    ));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let raw = envelope(&valid_token(), "Department", "hello");

    let outcome = state.dispatcher.handle(&raw, &cancel).await;

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn missing_model_settings_are_reported_in_band() {
    let (state, _backend) = state_with(Script::NoModel);
    let raw = envelope(&valid_token(), "Department", "hello");

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);
    assert_eq!(agent_texts(&records), vec![MISSING_MODEL_SETTINGS]);
}

#[tokio::test]
async fn unsupported_intent_type_is_refused() {
    let (state, backend) = state_with(Script::Plan(Vec::new(), "unused"));
    let mut intent = intent(&valid_token(), "Department");
    intent["intentType"] = json!("http://vital.ai/ontology/vital-aimp#AIMPIntentType_OTHER");
    let raw = json!([intent, {"type": "UserMessageContent", "text": "hi"}]).to_string();

    let records = reply_records(state.dispatcher.handle(&raw, &CancellationToken::new()).await);
    assert_eq!(agent_texts(&records), vec!["Error: Unsupported intent type."]);
    assert_eq!(backend.connects(), 0);
}
