use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Listener
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the gateway listens and how much inbound traffic it accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// In-flight HTTP requests, upgrade handshakes included.
    #[serde(default = "d_max_connections")]
    pub max_connections: usize,
    /// Frames a connection may queue while an earlier one is dispatched.
    #[serde(default = "d_frame_buffer")]
    pub frame_buffer: usize,
}

impl ServerConfig {
    /// `host:port` for the TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            cors: CorsConfig::default(),
            max_connections: d_max_connections(),
            frame_buffer: d_frame_buffer(),
        }
    }
}

/// Browser origins allowed to open the socket. An entry ending in `:*`
/// matches any port on that host; a lone `"*"` matches everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        matches!(self.allowed_origins.as_slice(), [only] if only == "*")
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_port() -> u16 {
    7009
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_connections() -> usize {
    256
}
fn d_frame_buffer() -> usize {
    16
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_locally() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:7009");
        assert_eq!(cfg.frame_buffer, 16);
        assert!(!cfg.cors.allows_any_origin());
    }

    #[test]
    fn partial_table_keeps_limits() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            port = 8080
            host = "0.0.0.0"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.max_connections, 256);
    }

    #[test]
    fn only_a_lone_star_is_a_wildcard() {
        let star = CorsConfig {
            allowed_origins: vec!["*".into()],
        };
        assert!(star.allows_any_origin());
        let mixed = CorsConfig {
            allowed_origins: vec!["*".into(), "http://localhost:*".into()],
        };
        assert!(!mixed.allows_any_origin());
    }
}
