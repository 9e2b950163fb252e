//! The planning loop: ask the model, run the tools it picks, repeat until
//! it answers in plain text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rh_domain::config::PlannerConfig;
use rh_domain::error::{Error, UpstreamError};
use rh_domain::tool::{Message, ToolCall, ToolDefinition};
use rh_providers::{ChatRequest, LlmProvider, OpenAiCompatProvider, ProviderTarget};
use rh_staffing::{AppSettings, StaffingProvider};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::pool::UpstreamPool;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PlanInput {
    pub system_prompt: String,
    /// Prior user/assistant turns, oldest first.
    pub history: Vec<Message>,
    pub user_text: String,
}

/// One tool call and the JSON it produced.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub call: ToolCall,
    pub result: Value,
}

#[derive(Debug, Clone)]
pub struct PlanOutput {
    pub answer: String,
    /// Every tool call in the order it ran.
    pub steps: Vec<ToolStep>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("cancelled")]
    Cancelled,
    #[error("model call failed: {0}")]
    Llm(#[from] Error),
    #[error("tool loop limit reached ({0} iterations)")]
    LoopLimit(usize),
}

/// Result of running one tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: Value,
    pub is_error: bool,
}

/// The tools available to one plan.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;
    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        input: PlanInput,
        tools: &dyn ToolExecutor,
        cancel: &CancellationToken,
    ) -> Result<PlanOutput, PlanError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolLoopPlanner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ToolLoopPlanner {
    provider: Arc<dyn LlmProvider>,
    cfg: PlannerConfig,
}

impl ToolLoopPlanner {
    pub fn new(provider: Arc<dyn LlmProvider>, cfg: PlannerConfig) -> Self {
        Self { provider, cfg }
    }
}

fn tool_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Planner for ToolLoopPlanner {
    async fn plan(
        &self,
        input: PlanInput,
        tools: &dyn ToolExecutor,
        cancel: &CancellationToken,
    ) -> Result<PlanOutput, PlanError> {
        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(Message::system(input.system_prompt));
        messages.extend(input.history);
        messages.push(Message::user(input.user_text));

        let definitions = tools.definitions();
        let mut steps = Vec::new();

        for loop_idx in 0..self.cfg.max_tool_loops {
            if cancel.is_cancelled() {
                return Err(PlanError::Cancelled);
            }
            let req = ChatRequest {
                messages: messages.clone(),
                tools: definitions.clone(),
                temperature: Some(self.cfg.temperature),
                top_p: Some(self.cfg.top_p),
                seed: self.cfg.seed,
                max_tokens: None,
                model: None,
            };

            let resp = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PlanError::Cancelled),
                resp = self.provider.chat(&req) => resp?,
            };

            if resp.tool_calls.is_empty() {
                tracing::debug!(loops = loop_idx + 1, steps = steps.len(), "plan complete");
                return Ok(PlanOutput {
                    answer: resp.content,
                    steps,
                });
            }

            messages.push(Message::assistant_tool_calls(&resp.content, &resp.tool_calls));

            // Sequential so snapshot entries land in call order.
            for call in resp.tool_calls {
                if cancel.is_cancelled() {
                    return Err(PlanError::Cancelled);
                }
                let out = tools.execute(&call).await;
                messages.push(Message::tool_result(
                    call.call_id.clone(),
                    tool_text(&out.content),
                    out.is_error,
                ));
                steps.push(ToolStep {
                    call,
                    result: out.content,
                });
            }
        }

        Err(PlanError::LoopLimit(self.cfg.max_tool_loops))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Planner factory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, thiserror::Error)]
pub enum PlannerSetupError {
    #[error("model key, endpoint or deployment is not configured")]
    MissingModelSettings,
    #[error("could not read app settings: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Builds the planner for one message.
#[async_trait]
pub trait PlannerFactory: Send + Sync {
    async fn planner(
        &self,
        staffing: Arc<dyn StaffingProvider>,
        pool: &UpstreamPool,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn Planner>, PlannerSetupError>;
}

/// Reads the tenant's model deployment from the backend app settings and
/// plans against it.
pub struct LlmPlannerFactory {
    client: reqwest::Client,
    cfg: PlannerConfig,
}

impl LlmPlannerFactory {
    pub fn new(cfg: PlannerConfig) -> rh_domain::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client, cfg })
    }

    fn target(&self, settings: &AppSettings) -> Result<ProviderTarget, PlannerSetupError> {
        let (Some(api_key), Some(endpoint), Some(deployment)) = (
            settings.get(AppSettings::MODEL_KEY),
            settings.get(AppSettings::MODEL_ENDPOINT),
            settings.get(AppSettings::MODEL_DEPLOYMENT),
        ) else {
            return Err(PlannerSetupError::MissingModelSettings);
        };
        Ok(ProviderTarget::Azure {
            endpoint: endpoint.to_owned(),
            api_key: api_key.to_owned(),
            deployment: deployment.to_owned(),
            api_version: settings
                .get(AppSettings::MODEL_API_VERSION)
                .unwrap_or(&self.cfg.default_api_version)
                .to_owned(),
        })
    }
}

#[async_trait]
impl PlannerFactory for LlmPlannerFactory {
    async fn planner(
        &self,
        staffing: Arc<dyn StaffingProvider>,
        pool: &UpstreamPool,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn Planner>, PlannerSetupError> {
        let settings = pool.run(cancel, staffing.app_settings()).await?;
        let target = self.target(&settings)?;
        let provider = OpenAiCompatProvider::new("azure", target, self.client.clone());
        Ok(Arc::new(ToolLoopPlanner::new(Arc::new(provider), self.cfg.clone())))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use parking_lot::Mutex;
    use rh_domain::error::Result;
    use rh_providers::ChatResponse;
    use serde_json::json;

    use super::*;

    struct Scripted {
        replies: Mutex<VecDeque<ChatResponse>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<ChatResponse>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
            self.seen.lock().push(req.clone());
            self.replies
                .lock()
                .pop_front()
                .ok_or_else(|| Error::Other("script exhausted".into()))
        }

        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    fn text(content: &str) -> ChatResponse {
        ChatResponse {
            content: content.into(),
            tool_calls: vec![],
            usage: None,
            model: "m".into(),
            finish_reason: Some("stop".into()),
        }
    }

    fn calls(names: &[&str]) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            tool_calls: names
                .iter()
                .enumerate()
                .map(|(i, n)| ToolCall {
                    call_id: format!("c{i}"),
                    tool_name: (*n).into(),
                    arguments: json!({}),
                })
                .collect(),
            usage: None,
            model: "m".into(),
            finish_reason: Some("tool_calls".into()),
        }
    }

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![]
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput {
                content: json!({"tool": call.tool_name}),
                is_error: false,
            }
        }
    }

    fn input() -> PlanInput {
        PlanInput {
            system_prompt: "sys".into(),
            history: vec![Message::user("earlier"), Message::assistant("reply")],
            user_text: "now".into(),
        }
    }

    #[tokio::test]
    async fn tool_steps_are_recorded_in_order() {
        let llm = Scripted::new(vec![calls(&["a", "b"]), calls(&["c"]), text("done")]);
        let planner = ToolLoopPlanner::new(llm.clone(), PlannerConfig::default());
        let out = planner
            .plan(input(), &Echo, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.answer, "done");
        let names: Vec<_> = out.steps.iter().map(|s| s.call.tool_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let seen = llm.seen.lock();
        assert_eq!(seen.len(), 3);
        // system + 2 history + user, then assistant + 2 results, then assistant + 1 result
        assert_eq!(seen[0].messages.len(), 4);
        assert_eq!(seen[2].messages.len(), 9);
        assert_eq!(seen[0].seed, Some(42));
    }

    #[tokio::test]
    async fn loop_limit_is_an_error() {
        let llm = Scripted::new(vec![calls(&["a"]), calls(&["a"])]);
        let cfg = PlannerConfig {
            max_tool_loops: 2,
            ..Default::default()
        };
        let err = ToolLoopPlanner::new(llm, cfg)
            .plan(input(), &Echo, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::LoopLimit(2)));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let llm = Scripted::new(vec![text("never")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ToolLoopPlanner::new(llm, PlannerConfig::default())
            .plan(input(), &Echo, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Cancelled));
    }

    #[test]
    fn missing_key_or_endpoint_is_reported() {
        let factory = LlmPlannerFactory::new(PlannerConfig::default()).unwrap();
        let only_key = AppSettings(HashMap::from([(AppSettings::MODEL_KEY.to_string(), "k".to_string())]));
        assert!(matches!(
            factory.target(&only_key),
            Err(PlannerSetupError::MissingModelSettings)
        ));
    }

    #[test]
    fn api_version_falls_back_to_default() {
        let factory = LlmPlannerFactory::new(PlannerConfig::default()).unwrap();
        let settings = AppSettings(HashMap::from([
            (AppSettings::MODEL_KEY.to_string(), "k".to_string()),
            (AppSettings::MODEL_ENDPOINT.to_string(), "https://x.example".to_string()),
            (AppSettings::MODEL_DEPLOYMENT.to_string(), "dep".to_string()),
        ]));
        match factory.target(&settings).unwrap() {
            ProviderTarget::Azure { api_version, deployment, .. } => {
                assert_eq!(api_version, "2024-06-01");
                assert_eq!(deployment, "dep");
            }
            other => panic!("unexpected target {other:?}"),
        }
    }
}
