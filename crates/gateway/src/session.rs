//! Per-message session context, rebuilt from the envelope on every turn.

use rh_contextpack::ContextSnapshot;
use rh_domain::config::DispatchConfig;
use rh_domain::error::{ProtocolError, ScopeError};
use rh_protocol::IntentRecord;
use rh_staffing::CallerIdentity;

use crate::auth::Credential;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Scope(e) => e.user_message(),
            SessionError::Protocol(e) => format!("Error: {e}."),
        }
    }
}

/// Everything a single message needs to act on the caller's behalf.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub credential: Credential,
    pub session_id: String,
    pub account_id: Option<String>,
    pub login_id: Option<String>,
    pub username: Option<String>,
    pub org_level_id: i64,
    pub org_level_type: String,
    /// Tool results resent by the client, capped at the configured
    /// capacity.
    pub snapshot: ContextSnapshot,
}

impl SessionContext {
    /// Scope first, then the fields the tools need.
    pub fn build(
        credential: Credential,
        intent: &IntentRecord,
        snapshot_text: Option<&str>,
        cfg: &DispatchConfig,
    ) -> Result<Self, SessionError> {
        let level = intent.org_level_type.clone().unwrap_or_default();
        if level != cfg.permitted_org_level {
            return Err(ScopeError::WrongLevel {
                actual: level,
                permitted: cfg.permitted_org_level.clone(),
            }
            .into());
        }

        let org_level_id = intent
            .org_level_id
            .ok_or(ProtocolError::MissingField("orgLevelId"))?;

        Ok(Self {
            session_id: intent.session_id.clone().unwrap_or_default(),
            account_id: intent.account_id.clone(),
            login_id: intent.login_id.clone(),
            username: intent.username.clone(),
            org_level_id,
            org_level_type: level,
            snapshot: ContextSnapshot::from_json(snapshot_text, cfg.snapshot_capacity),
            credential,
        })
    }

    /// Identity forwarded on staffing calls. The login header carries
    /// the credential's subject.
    pub fn caller_identity(&self) -> CallerIdentity {
        CallerIdentity {
            token: self.credential.token().to_owned(),
            alias: self.credential.alias.clone(),
            login: self.credential.subject_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rh_domain::config::AuthConfig;
    use serde_json::json;

    use super::*;
    use crate::auth::tests::token_with;
    use crate::auth::{AuthGate, TrustPresentedClaims};

    fn credential() -> Credential {
        let token = token_with(json!({"iss": "slxx", "alias": "acme", "subjectId": "jdoe", "exp": 4_000_000_000i64}));
        AuthGate::new(&AuthConfig::default(), Arc::new(TrustPresentedClaims))
            .authenticate(Some(&token), 1_800_000_000)
            .unwrap()
    }

    fn intent(level: Option<&str>, org: Option<i64>) -> IntentRecord {
        IntentRecord {
            session_id: Some("s-1".into()),
            org_level_type: level.map(str::to_owned),
            org_level_id: org,
            ..Default::default()
        }
    }

    #[test]
    fn department_scope_builds() {
        let ctx = SessionContext::build(credential(), &intent(Some("Department"), Some(12)), None, &DispatchConfig::default())
            .unwrap();
        assert_eq!(ctx.org_level_id, 12);
        assert_eq!(ctx.session_id, "s-1");
        let who = ctx.caller_identity();
        assert_eq!(who.alias, "acme");
        assert_eq!(who.login, "jdoe");
    }

    #[test]
    fn wrong_level_is_rejected_before_field_checks() {
        let err = SessionContext::build(credential(), &intent(Some("Facility"), None), None, &DispatchConfig::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Scope(_)));
        assert!(err.user_message().contains("Please move to department level."));
    }

    #[test]
    fn missing_org_level_id_is_a_protocol_error() {
        let err = SessionContext::build(credential(), &intent(Some("Department"), None), None, &DispatchConfig::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Protocol(ProtocolError::MissingField("orgLevelId"))));
    }

    #[test]
    fn resent_snapshot_is_capped_on_build() {
        let resent = json!([
            {"type": "a", "data": 1},
            {"type": "b", "data": 2},
            {"type": "c", "data": 3},
            {"type": "d", "data": 4}
        ])
        .to_string();
        let cfg = DispatchConfig::default();
        let ctx = SessionContext::build(credential(), &intent(Some("Department"), Some(12)), Some(&resent), &cfg)
            .unwrap();
        assert_eq!(ctx.snapshot.capacity(), cfg.snapshot_capacity);
        assert!(ctx.snapshot.len() <= cfg.snapshot_capacity);
        assert_eq!(ctx.snapshot.iter().last().map(|e| e.entry_type.as_str()), Some("d"));
    }
}
