//! Resource services: the only entry points that mutate workspace state.
//!
//! Every mutating operation runs the same pipeline:
//!
//! 1. **Resolve** the target row (and with it the owning tenant / owner)
//! 2. **Authorize** through [`workhive_auth::authorize`]
//! 3. **Validate** the input shape
//! 4. **Persist**, through the store's atomic quota primitive when the row
//!    is countable
//! 5. **Record** one audit entry, after the write committed
//!
//! Reads stop after step 2 and are filtered by the session's read scope.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use workhive_auth::{
    authorize, Action, AuthError, CredentialVerifier, DenyReason, ResourceScope, Role,
    SessionContext,
};
use workhive_core::{DomainError, TenantId};
use workhive_tenancy::ResourceKind;

use crate::audit::AuditRecorder;
use crate::store::{StoreError, WorkspaceStore};

pub mod audit_log;
pub mod auth;
pub mod projects;
pub mod tasks;
pub mod tenants;
pub mod users;

pub use auth::{LoginOutcome, LoginRequest, Registration, RegisterTenant};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("access denied: {0}")]
    Denied(DenyReason),

    #[error("{} limit reached ({limit}); upgrade the subscription plan", kind.as_str())]
    LimitReached { kind: ResourceKind, limit: u32 },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable, transport-independent error classification.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Conflict,
    Denied,
    LimitReached,
    Unauthenticated,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Denied => "denied",
            ErrorKind::LimitReached => "limit_reached",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Internal => "internal",
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::ValidationError,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Denied(_) => ErrorKind::Denied,
            ServiceError::LimitReached { .. } => ErrorKind::LimitReached,
            ServiceError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(e: DomainError) -> Self {
        ServiceError::Validation(e.message().to_string())
    }
}

impl From<DenyReason> for ServiceError {
    fn from(reason: DenyReason) -> Self {
        ServiceError::Denied(reason)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::LimitReached { kind, limit } => ServiceError::LimitReached { kind, limit },
            StoreError::Backend(msg) => {
                tracing::error!(error = %msg, "storage failure");
                ServiceError::Internal("storage failure".to_string())
            }
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Crypto(msg) => {
                tracing::error!(error = %msg, "credential backend failure");
                ServiceError::Internal("credential backend failure".to_string())
            }
            other => ServiceError::Unauthenticated(other.to_string()),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Resource services over one store.
pub struct WorkspaceServices<S> {
    store: S,
    credentials: Arc<dyn CredentialVerifier>,
    audit: AuditRecorder,
}

impl<S: WorkspaceStore> WorkspaceServices<S> {
    pub fn new(store: S, credentials: Arc<dyn CredentialVerifier>, audit: AuditRecorder) -> Self {
        Self { store, credentials, audit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    /// Verify a bearer token and build the request's session.
    pub fn session_from_token(&self, token: &str) -> ServiceResult<SessionContext> {
        let now = Utc::now();
        let claims = self.credentials.decode_token(token, now)?;
        Ok(SessionContext::from_claims(&claims, now)?)
    }

    /// Hash on the blocking pool so Argon2 never stalls an async worker.
    async fn hash_password(&self, plaintext: &str) -> ServiceResult<String> {
        let credentials = Arc::clone(&self.credentials);
        let plaintext = plaintext.to_owned();
        let hashed = tokio::task::spawn_blocking(move || credentials.hash_password(&plaintext))
            .await
            .map_err(|e| ServiceError::Internal(format!("password hashing task failed: {e}")))?;
        Ok(hashed?)
    }

    async fn verify_password(&self, plaintext: &str, hash: &str) -> ServiceResult<bool> {
        let credentials = Arc::clone(&self.credentials);
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        let verified = tokio::task::spawn_blocking(move || credentials.verify_password(&plaintext, &hash))
            .await
            .map_err(|e| ServiceError::Internal(format!("password check task failed: {e}")))?;
        Ok(verified?)
    }

    fn guard(&self, ctx: &SessionContext, action: Action, resource: ResourceScope) -> ServiceResult<()> {
        authorize(ctx, action, &resource).into_result().map_err(ServiceError::Denied)
    }

    /// Resource scope for tenant-wide operations that name no explicit target:
    /// the caller's own tenant, or the whole platform for super_admin.
    fn home_scope(ctx: &SessionContext) -> ResourceScope {
        match ctx.tenant_id() {
            Some(t) if ctx.role() != Role::SuperAdmin => ResourceScope::tenant(t),
            _ => ResourceScope::platform(),
        }
    }

    /// The caller's tenant after a creation was authorized.
    fn own_tenant(ctx: &SessionContext) -> ServiceResult<TenantId> {
        ctx.tenant_id().ok_or(ServiceError::Denied(DenyReason::InsufficientRole))
    }
}
