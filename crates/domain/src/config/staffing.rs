use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Staffing backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffingConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Total attempts per call, the first one included.
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    /// First retry delay; doubles on each further attempt.
    #[serde(default = "d_backoff_ms")]
    pub backoff_ms: u64,
    /// Organization level whose active employees form the search roster.
    #[serde(default = "d_roster_org_level")]
    pub roster_org_level_id: i64,
}

impl Default for StaffingConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            timeout_ms: d_timeout_ms(),
            max_attempts: d_max_attempts(),
            backoff_ms: d_backoff_ms(),
            roster_org_level_id: d_roster_org_level(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream worker pool
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounds on in-flight upstream work shared by all connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent: usize,
    /// Callers allowed to wait for a permit before new work is refused.
    #[serde(default = "d_max_queued")]
    pub max_queued: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: d_max_concurrent(),
            max_queued: d_max_queued(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://localhost:8080".into()
}
fn d_timeout_ms() -> u64 {
    10_000
}
fn d_max_attempts() -> u32 {
    3
}
fn d_backoff_ms() -> u64 {
    300
}
fn d_roster_org_level() -> i64 {
    1
}
fn d_max_concurrent() -> usize {
    8
}
fn d_max_queued() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_defaults() {
        let cfg = StaffingConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.backoff_ms, 300);
        assert_eq!(cfg.timeout_ms, 10_000);
    }

    #[test]
    fn partial_pool_section() {
        let cfg: PoolConfig = toml::from_str("max_concurrent = 2").unwrap();
        assert_eq!(cfg.max_concurrent, 2);
        assert_eq!(cfg.max_queued, 64);
    }
}
