use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use workhive_core::{TenantId, UserId};

use crate::token::TokenCodec;
use crate::{password, AuthError, Role, SessionClaims};

/// A freshly signed session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
    pub claims: SessionClaims,
}

/// Password and token mechanics, kept behind one seam so services never see
/// the hashing or signing algorithms.
pub trait CredentialVerifier: Send + Sync {
    fn hash_password(&self, plaintext: &str) -> Result<String, AuthError>;

    fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError>;

    fn issue_token(
        &self,
        actor_id: UserId,
        tenant_id: Option<TenantId>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError>;

    fn decode_token(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError>;
}

/// Argon2id password hashes plus HS256 session tokens.
#[derive(Debug, Clone)]
pub struct Credentials {
    tokens: TokenCodec,
}

impl Credentials {
    pub const DEFAULT_TTL_SECS: i64 = 86_400;

    pub fn new(jwt_secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        Self {
            tokens: TokenCodec::new(jwt_secret.as_ref(), Duration::seconds(ttl_secs)),
        }
    }
}

impl CredentialVerifier for Credentials {
    fn hash_password(&self, plaintext: &str) -> Result<String, AuthError> {
        password::hash_password(plaintext)
    }

    fn verify_password(&self, plaintext: &str, hash: &str) -> Result<bool, AuthError> {
        password::verify_password(plaintext, hash)
    }

    fn issue_token(
        &self,
        actor_id: UserId,
        tenant_id: Option<TenantId>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let claims = SessionClaims {
            user_id: actor_id,
            tenant_id,
            role,
            issued_at: now,
            expires_at: now + self.tokens.ttl(),
        };
        let token = self.tokens.sign(&claims)?;
        Ok(IssuedToken {
            token,
            expires_in: self.tokens.ttl().num_seconds(),
            claims,
        })
    }

    fn decode_token(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        self.tokens.verify(token, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionContext;

    #[test]
    fn issued_token_round_trips_into_a_session() {
        let creds = Credentials::new("s3cret", Credentials::DEFAULT_TTL_SECS);
        let now = Utc::now();
        let tenant = TenantId::new();
        let user = UserId::new();

        let issued = creds.issue_token(user, Some(tenant), Role::TenantAdmin, now).unwrap();
        assert_eq!(issued.expires_in, 86_400);

        let claims = creds.decode_token(&issued.token, now).unwrap();
        let ctx = SessionContext::from_claims(&claims, now).unwrap();
        assert_eq!(ctx.actor_id(), user);
        assert_eq!(ctx.tenant_id(), Some(tenant));
        assert_eq!(ctx.role(), Role::TenantAdmin);
    }
}
