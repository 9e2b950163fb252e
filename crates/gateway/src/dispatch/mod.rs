//! The per-message state machine.
//!
//! ```text
//! Received → Parsed → Authenticated → Scoped → Planned → Responded
//!     └──────────┴───────────┴───────────┴─────────┴──→ Failed | Cancelled
//! ```
//!
//! Every inbound frame ends in exactly one [`Outcome`]: a reply frame, a
//! connection close, or nothing at all when the connection went away
//! while the message was being handled.

use std::sync::Arc;
use std::time::Instant;

use chrono_tz::Tz;
use rh_contextpack::prompt::local_today;
use rh_contextpack::{prompt_turns, window_exchanges, PromptBuilder};
use rh_domain::config::Config;
use rh_domain::error::{Error, ProtocolError, UpstreamError};
use rh_domain::trace::TraceEvent;
use rh_protocol::envelope::{error_records, reply_records, to_frame};
use rh_protocol::{ConversationRecord, Envelope, EnvelopeRecord, HistoryCodec};
use rh_staffing::StaffingConnector;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::auth::AuthGate;
use crate::runtime::{
    PlanError, PlanInput, PlanOutput, PlannerFactory, PlannerSetupError, RequestTools, ToolScope,
    UpstreamPool,
};
use crate::session::SessionContext;

/// WebSocket close code sent when a credential is absent or malformed.
pub const CLOSE_UNAUTHENTICATED: u16 = 1011;
pub const CLOSE_UNAUTHENTICATED_REASON: &str = r#"{"code":401,"error":"Unauthenticated."}"#;

pub const PLANNER_FAILURE: &str =
    "Sorry, I ran into a problem handling that request. Please try again.";
pub const MISSING_MODEL_SETTINGS: &str = "You have not set your OpenAI key and/or endpoint.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome and state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single terminal signal for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send this text frame.
    Reply(String),
    /// Close the connection with this code and reason.
    Close { code: u16, reason: String },
    /// Send nothing.
    Cancelled,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Reply(_) => "reply",
            Outcome::Close { .. } => "close",
            Outcome::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Received,
    Parsed,
    Authenticated,
    Scoped,
    Planned,
    Responded,
    Failed,
    Cancelled,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Received => "received",
            DispatchState::Parsed => "parsed",
            DispatchState::Authenticated => "authenticated",
            DispatchState::Scoped => "scoped",
            DispatchState::Planned => "planned",
            DispatchState::Responded => "responded",
            DispatchState::Failed => "failed",
            DispatchState::Cancelled => "cancelled",
        }
    }
}

/// Where a message ended up, plus the session it belonged to.
#[derive(Debug)]
struct Finished {
    outcome: Outcome,
    state: DispatchState,
    /// Last state reached before the terminal one.
    reached: DispatchState,
    session_id: String,
}

impl Finished {
    fn new(outcome: Outcome, state: DispatchState, session_id: &str) -> Self {
        Self {
            outcome,
            state,
            reached: DispatchState::Received,
            session_id: session_id.to_owned(),
        }
    }

    fn after(mut self, reached: DispatchState) -> Self {
        self.reached = reached;
        self
    }

    fn cancelled(session_id: &str) -> Self {
        Self::new(Outcome::Cancelled, DispatchState::Cancelled, session_id)
    }
}

fn frame(records: &[EnvelopeRecord]) -> Outcome {
    match to_frame(records) {
        Ok(text) => Outcome::Reply(text),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize reply frame");
            Outcome::Close {
                code: 1011,
                reason: "internal error".into(),
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Dispatcher {
    cfg: Arc<Config>,
    auth: AuthGate,
    connector: Arc<dyn StaffingConnector>,
    planners: Arc<dyn PlannerFactory>,
    pool: Arc<UpstreamPool>,
    tz: Tz,
}

impl Dispatcher {
    pub fn new(
        cfg: Arc<Config>,
        auth: AuthGate,
        connector: Arc<dyn StaffingConnector>,
        planners: Arc<dyn PlannerFactory>,
        pool: Arc<UpstreamPool>,
    ) -> rh_domain::error::Result<Self> {
        let tz: Tz = cfg
            .dispatch
            .timezone
            .parse()
            .map_err(|e| Error::Config(format!("dispatch.timezone: {e}")))?;
        Ok(Self {
            cfg,
            auth,
            connector,
            planners,
            pool,
            tz,
        })
    }

    /// Handle one inbound frame.
    pub async fn handle(&self, raw: &str, cancel: &CancellationToken) -> Outcome {
        let started = Instant::now();
        let span = tracing::info_span!("dispatch", session_id = tracing::field::Empty);
        let finished = self.run(raw, cancel, &span).instrument(span.clone()).await;

        span.in_scope(|| {
            tracing::debug!(
                state = finished.state.as_str(),
                reached = finished.reached.as_str(),
                outcome = finished.outcome.label(),
                "message dispatched"
            );
            TraceEvent::MessageDispatched {
                session_id: finished.session_id.clone(),
                outcome: finished.outcome.label().into(),
                final_state: finished.state.as_str().into(),
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
        });
        finished.outcome
    }

    async fn run(&self, raw: &str, cancel: &CancellationToken, span: &tracing::Span) -> Finished {
        use DispatchState as S;

        // ── Received → Parsed ────────────────────────────────────────
        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                // No intent means no credential to check.
                tracing::warn!(error = %e, "envelope has no usable intent");
                return Finished::new(self.unauthenticated(), S::Failed, "");
            }
        };
        let mut reached = S::Parsed;
        let session_id = envelope.intent.session_id.clone().unwrap_or_default();
        span.record("session_id", session_id.as_str());
        if !envelope.skipped.is_empty() {
            tracing::debug!(skipped = envelope.skipped.len(), "envelope records skipped");
        }

        let reply_type = envelope
            .intent
            .intent_type
            .clone()
            .unwrap_or_else(|| self.cfg.dispatch.chat_intent_type.clone());
        let fail = |at: DispatchState, message: &str| {
            Finished::new(frame(&error_records(&reply_type, message)), S::Failed, &session_id)
                .after(at)
        };

        // ── Parsed → Authenticated ───────────────────────────────────
        let now = chrono::Utc::now().timestamp();
        let credential = match self
            .auth
            .authenticate(envelope.intent.credential.as_deref(), now)
        {
            Ok(credential) => credential,
            Err(e) if e.closes_connection() => {
                tracing::warn!(error = %e, "closing connection");
                return Finished::new(self.unauthenticated(), S::Failed, &session_id).after(reached);
            }
            Err(e) => {
                tracing::info!(error = %e, "credential rejected");
                return fail(reached, e.user_message());
            }
        };
        reached = S::Authenticated;

        // ── Authenticated → Scoped ───────────────────────────────────
        let ctx = match SessionContext::build(
            credential,
            &envelope.intent,
            envelope.snapshot_text(),
            &self.cfg.dispatch,
        ) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::info!(error = %e, "session rejected");
                return fail(reached, &e.user_message());
            }
        };
        if reply_type != self.cfg.dispatch.chat_intent_type {
            tracing::info!(intent_type = %reply_type, "unsupported intent type");
            return fail(reached, "Error: Unsupported intent type.");
        }
        let Some(user_text) = envelope.user_text().map(str::to_owned) else {
            let e = ProtocolError::MissingField("UserMessageContent");
            tracing::info!(error = %e, "no user message");
            return fail(reached, &format!("Error: {e}."));
        };
        reached = S::Scoped;
        if cancel.is_cancelled() {
            return Finished::cancelled(&session_id).after(reached);
        }

        // ── Scoped → Planned ─────────────────────────────────────────
        let staffing = match self.connector.connect(ctx.caller_identity()) {
            Ok(staffing) => staffing,
            Err(e) => {
                tracing::error!(error = %e, "staffing client unavailable");
                return fail(reached, PLANNER_FAILURE);
            }
        };
        let planner = match self.planners.planner(staffing.clone(), &self.pool, cancel).await {
            Ok(planner) => planner,
            Err(PlannerSetupError::MissingModelSettings) => {
                return fail(reached, MISSING_MODEL_SETTINGS)
            }
            Err(PlannerSetupError::Upstream(UpstreamError::Cancelled)) => {
                return Finished::cancelled(&session_id).after(reached)
            }
            Err(e) => {
                tracing::warn!(error = %e, "planner setup failed");
                return fail(reached, PLANNER_FAILURE);
            }
        };

        let decoded = HistoryCodec::decode(envelope.history_bundle());
        if !decoded.skipped.is_empty() {
            tracing::debug!(skipped = decoded.skipped.len(), "history records skipped");
        }
        let (prior, _) = window_exchanges(&decoded.records, self.cfg.dispatch.history_exchanges);
        let today = local_today(self.tz);
        let system_prompt = PromptBuilder::new(
            today,
            &self.cfg.dispatch.permitted_org_level,
            &ctx.org_level_type,
        )
        .build(&ctx.snapshot);

        let tools = RequestTools::new(
            staffing,
            self.pool.clone(),
            cancel.clone(),
            ToolScope {
                org_level_id: ctx.org_level_id,
                roster_org_level_id: self.cfg.staffing.roster_org_level_id,
                today,
                resolver: self.cfg.resolver.clone(),
            },
            ctx.snapshot.clone(),
        );

        let input = PlanInput {
            system_prompt,
            history: prompt_turns(&prior),
            user_text: user_text.clone(),
        };
        let plan = match planner.plan(input, &tools, cancel).await {
            Ok(plan) => plan,
            Err(PlanError::Cancelled) => return Finished::cancelled(&session_id).after(reached),
            Err(_) if cancel.is_cancelled() => {
                return Finished::cancelled(&session_id).after(reached)
            }
            Err(e) => {
                tracing::warn!(error = %e, "planning failed");
                return fail(reached, PLANNER_FAILURE);
            }
        };
        reached = S::Planned;
        if cancel.is_cancelled() {
            return Finished::cancelled(&session_id).after(reached);
        }

        // ── Planned → Responded ──────────────────────────────────────
        let history = self.next_history(prior, &user_text, &plan, &session_id);
        let snapshot_json = match tools.into_snapshot().to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode snapshot");
                "[]".to_owned()
            }
        };

        let records = reply_records(&reply_type, &plan.answer, history, snapshot_json);
        let outcome = frame(&records);
        let state = if matches!(outcome, Outcome::Reply(_)) {
            S::Responded
        } else {
            S::Failed
        };
        Finished::new(outcome, state, &session_id).after(reached)
    }

    fn unauthenticated(&self) -> Outcome {
        Outcome::Close {
            code: CLOSE_UNAUTHENTICATED,
            reason: CLOSE_UNAUTHENTICATED_REASON.into(),
        }
    }

    /// Append this exchange to the prior window, re-window and encode.
    /// `None` when nothing is left to carry.
    fn next_history(
        &self,
        mut records: Vec<ConversationRecord>,
        user_text: &str,
        plan: &PlanOutput,
        session_id: &str,
    ) -> Option<String> {
        records.push(ConversationRecord::marker(&self.cfg.dispatch.agent_name));
        records.push(ConversationRecord::user(user_text));
        for step in &plan.steps {
            records.push(ConversationRecord::tool_request(json!({
                "id": step.call.call_id,
                "name": step.call.tool_name,
                "arguments": step.call.arguments,
            })));
            records.push(ConversationRecord::tool_result(json!({
                "id": step.call.call_id,
                "name": step.call.tool_name,
                "content": step.result,
            })));
        }
        records.push(ConversationRecord::bot(&plan.answer));

        let records_in = records.len();
        let (windowed, report) = window_exchanges(&records, self.cfg.dispatch.history_exchanges);
        TraceEvent::HistoryWindowed {
            session_id: session_id.to_owned(),
            records_in,
            records_out: windowed.len(),
            exchanges_dropped: report.exchanges_dropped,
        }
        .emit();

        if windowed.is_empty() {
            return None;
        }
        match HistoryCodec::encode(&windowed) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode history");
                None
            }
        }
    }
}
