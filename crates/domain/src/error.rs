/// Shared error type used across all request-handler crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("upstream: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("cancelled")]
    Cancelled,

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Authentication
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why an inbound bearer credential was refused.
///
/// `MalformedCredential` means the token could not be read at all and the
/// connection is closed. Every other variant is a readable token with bad
/// claims, answered with a single in-band message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential is absent or malformed")]
    MalformedCredential,

    #[error("credential issuer is not accepted")]
    BadIssuer,

    #[error("credential has no alias claim")]
    MissingAlias,

    #[error("credential has no subject claim")]
    MissingSubject,

    #[error("credential has expired")]
    Expired,
}

impl AuthError {
    /// Claim-level failures that are reported in-band instead of closing.
    pub fn is_missing_claim(&self) -> bool {
        matches!(self, AuthError::MissingAlias | AuthError::MissingSubject)
    }

    pub fn closes_connection(&self) -> bool {
        matches!(self, AuthError::MalformedCredential)
    }

    /// Operator-facing text for the in-band error response.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::MalformedCredential => "Unauthenticated.",
            AuthError::BadIssuer => "Error: Unauthenticated request.",
            AuthError::MissingAlias => {
                "Error: Unauthenticated request without whitelisted alias."
            }
            AuthError::MissingSubject => "Error: Unauthenticated request without user id",
            AuthError::Expired => "Error: Unauthenticated. Expired token.",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("organization level {actual:?} is not permitted (expected {permitted:?})")]
    WrongLevel { actual: String, permitted: String },
}

impl ScopeError {
    pub fn user_message(&self) -> String {
        match self {
            ScopeError::WrongLevel { permitted, .. } => format!(
                "This information is available only at the following organization levels: \
                 {permitted}. Please move to {} level.",
                permitted.to_lowercase()
            ),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire protocol
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("envelope contains no records")]
    EmptyEnvelope,

    #[error("envelope does not start with an intent record")]
    MissingIntent,

    #[error("intent record is missing field `{0}`")]
    MissingField(&'static str),

    #[error("unrecognized record type {0:?}")]
    UnrecognizedRecord(String),

    #[error("record {index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("history bundle is malformed: {0}")]
    MalformedBundle(String),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream (staffing backend)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Transport(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last_status: Option<u16>,
        last: String,
    },

    #[error("upstream worker pool is saturated")]
    Saturated,

    #[error("cancelled")]
    Cancelled,

    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

impl UpstreamError {
    /// Status-like code reported back to the planner in tool results.
    pub fn code(&self) -> u16 {
        match self {
            UpstreamError::HttpStatus { status, .. } => *status,
            UpstreamError::Timeout(_) => 504,
            UpstreamError::Transport(_) | UpstreamError::Decode(_) => 502,
            UpstreamError::RetriesExhausted { last_status, .. } => last_status.unwrap_or(503),
            UpstreamError::Saturated => 503,
            UpstreamError::Cancelled => 499,
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::HttpStatus { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            UpstreamError::Timeout(_) | UpstreamError::Transport(_) => true,
            _ => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool argument validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date format: {0}. Expected YYYY-MM-DD or MM-DD-YYYY.")]
    BadDateFormat(String),

    #[error(
        "Date {0} is in the past. Only requests for today and future are allowed to be approved or denied."
    )]
    PastDate(String),

    #[error("missing required argument `{0}`")]
    MissingArgument(String),

    #[error("request_for must be \"approve\" or \"deny\", got {0:?}")]
    BadAction(String),
}

impl ValidationError {
    pub fn code(&self) -> u16 {
        400
    }
}
