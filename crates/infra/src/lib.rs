//! Infrastructure layer: storage, quota reservation, audit delivery and the
//! resource services built on them.

pub mod audit;
pub mod quota;
pub mod services;
pub mod store;

mod integration_tests;

pub use audit::{AuditRecorder, AuditSink, AuditSinkError, StoreAuditSink};
pub use quota::{QuotaUsage, Reservation};
pub use services::{ErrorKind, ServiceError, ServiceResult, WorkspaceServices};
pub use store::{
    CountableRow, InMemoryWorkspaceStore, PostgresWorkspaceStore, StoreError, WorkspaceStore,
};
