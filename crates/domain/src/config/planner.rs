use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Planner (LLM tool loop)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sampling and loop limits for the planning model.
///
/// Endpoint, key and deployment are not configured here: they are read
/// per message from the staffing backend's app settings, so each tenant
/// brings its own model deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "d_max_tool_loops")]
    pub max_tool_loops: usize,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "d_top_p")]
    pub top_p: f32,
    #[serde(default = "d_seed")]
    pub seed: Option<u64>,
    /// Used when the backend does not publish an API version.
    #[serde(default = "d_api_version")]
    pub default_api_version: String,
    #[serde(default = "d_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_tool_loops: d_max_tool_loops(),
            temperature: 0.0,
            top_p: d_top_p(),
            seed: d_seed(),
            default_api_version: d_api_version(),
            request_timeout_ms: d_timeout_ms(),
        }
    }
}

fn d_max_tool_loops() -> usize {
    25
}
fn d_top_p() -> f32 {
    0.1
}
fn d_seed() -> Option<u64> {
    Some(42)
}
fn d_api_version() -> String {
    "2024-06-01".into()
}
fn d_timeout_ms() -> u64 {
    60_000
}
