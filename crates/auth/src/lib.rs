//! `workhive-auth` — sessions, the authorization engine, and credentials.
//!
//! Decoupled from HTTP and storage: everything here is either pure policy or
//! a thin wrapper over a hashing/signing primitive.

pub mod action;
pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod error;
pub mod password;
pub mod role;
pub mod session;
pub mod token;

pub use action::{Action, ActionKind, UserPatchScope};
pub use authorize::{
    authorize, policy_for, Decision, DenyReason, MemberPolicy, ResourceScope, RolePolicy,
    SuperAdminPolicy, TenantAdminPolicy,
};
pub use claims::{validate_claims, SessionClaims, TokenValidationError};
pub use credentials::{CredentialVerifier, Credentials, IssuedToken};
pub use error::AuthError;
pub use role::Role;
pub use session::{SessionContext, TenantScope};
