//! AuthGate: structural checks, claim decoding and claim validation for
//! the credential carried in every inbound intent.
//!
//! The credential is a three-segment token (`header.payload.signature`,
//! base64url). Signatures are checked through a [`SignatureVerifier`];
//! the shipped verifier trusts the presented claims.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rh_domain::config::AuthConfig;
use rh_domain::error::AuthError;
use serde_json::{Map, Value};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Signature verification seam
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Checks the signature segment of a credential.
pub trait SignatureVerifier: Send + Sync {
    /// `signing_input` is `header.payload` exactly as received.
    fn verify(&self, signing_input: &str, signature: &str) -> bool;
}

/// Accepts every signature. Claims are taken as presented.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustPresentedClaims;

impl SignatureVerifier for TrustPresentedClaims {
    fn verify(&self, _signing_input: &str, _signature: &str) -> bool {
        true
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Claims and credential
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Claims decoded from the payload segment, not yet validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims {
    pub issuer: Option<String>,
    pub alias: Option<String>,
    pub subject_id: Option<String>,
    /// Unix seconds; integer or float on the wire.
    pub expires_at: Option<f64>,
    pub role: Option<Value>,
}

impl Claims {
    /// Read claims from a decoded payload object. Values of the wrong
    /// type count as absent so validation, not decoding, rejects them.
    /// `subjectId` wins over `user_id` when both are present.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            issuer: payload.get("iss").and_then(Value::as_str).map(str::to_owned),
            alias: payload.get("alias").and_then(scalar_text),
            subject_id: payload
                .get("subjectId")
                .and_then(scalar_text)
                .or_else(|| payload.get("user_id").and_then(scalar_text)),
            expires_at: payload.get("exp").and_then(|exp| match exp {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }),
            role: payload.get("role").filter(|r| !r.is_null()).cloned(),
        }
    }
}

/// A string, or a number rendered as a string.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A credential whose claims passed validation. Lives for one message.
#[derive(Clone)]
pub struct Credential {
    pub issuer: String,
    pub alias: String,
    pub subject_id: String,
    pub expires_at: f64,
    pub role: Option<String>,
    token: String,
}

impl Credential {
    /// The raw token, forwarded to the staffing backend as a bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("issuer", &self.issuer)
            .field("alias", &self.alias)
            .field("subject_id", &self.subject_id)
            .field("expires_at", &self.expires_at)
            .field("role", &self.role)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AuthGate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub struct AuthGate {
    expected_issuer: String,
    leeway_secs: i64,
    verifier: Arc<dyn SignatureVerifier>,
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("expected_issuer", &self.expected_issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

fn decode_segment(segment: &str) -> Option<Value> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

impl AuthGate {
    pub fn new(cfg: &AuthConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            expected_issuer: cfg.expected_issuer.clone(),
            leeway_secs: cfg.leeway_secs,
            verifier,
        }
    }

    /// Three dot-separated segments; the first two decode as base64url
    /// (padding optional) into JSON.
    pub fn is_well_formed(token: &str) -> bool {
        let parts: Vec<&str> = token.split('.').collect();
        parts.len() == 3 && decode_segment(parts[0]).is_some() && decode_segment(parts[1]).is_some()
    }

    /// Decode the payload claims. The signature is checked here too, so
    /// a token that fails verification is treated as malformed.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        if !Self::is_well_formed(token) {
            return Err(AuthError::MalformedCredential);
        }
        let (signing_input, signature) = token
            .rsplit_once('.')
            .ok_or(AuthError::MalformedCredential)?;
        if !self.verifier.verify(signing_input, signature) {
            tracing::warn!("credential signature rejected");
            return Err(AuthError::MalformedCredential);
        }

        match token.split('.').nth(1).and_then(decode_segment) {
            Some(Value::Object(payload)) => Ok(Claims::from_payload(&payload)),
            _ => Err(AuthError::MalformedCredential),
        }
    }

    /// Check claims against the expected issuer and the clock. The first
    /// failing rule wins, in the order issuer, alias, subject, expiry.
    pub fn validate(&self, claims: Claims, token: &str, now: i64) -> Result<Credential, AuthError> {
        let issuer = claims
            .issuer
            .filter(|iss| *iss == self.expected_issuer)
            .ok_or(AuthError::BadIssuer)?;
        let alias = claims
            .alias
            .filter(|a| !a.trim().is_empty())
            .ok_or(AuthError::MissingAlias)?;
        let subject_id = claims
            .subject_id
            .filter(|s| !s.trim().is_empty())
            .ok_or(AuthError::MissingSubject)?;

        let expires_at = claims.expires_at.ok_or(AuthError::Expired)?;
        if expires_at <= (now - self.leeway_secs) as f64 {
            return Err(AuthError::Expired);
        }

        let role = claims.role.and_then(|r| match r {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });

        Ok(Credential {
            issuer,
            alias,
            subject_id,
            expires_at,
            role,
            token: token.to_owned(),
        })
    }

    /// Decode and validate. An absent or blank token is malformed.
    pub fn authenticate(&self, token: Option<&str>, now: i64) -> Result<Credential, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedCredential)?;
        let claims = self.decode(token)?;
        self.validate(claims, token, now)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
