//! Audit recorder: best-effort trail of committed mutations.
//!
//! Services call [`AuditRecorder::record`] exactly once, after the primary
//! write committed. Nothing here can fail or roll back the caller: sink
//! errors are logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use workhive_core::{TenantId, UserId};
use workhive_tenancy::{AuditAction, AuditLogEntry, EntityType};

use crate::store::{StoreError, WorkspaceStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit sink failure: {0}")]
pub struct AuditSinkError(pub String);

impl From<StoreError> for AuditSinkError {
    fn from(e: StoreError) -> Self {
        Self(e.to_string())
    }
}

/// Destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), AuditSinkError>;
}

/// Writes audit entries into the workspace store's `audit_logs`.
pub struct StoreAuditSink<S> {
    store: S,
}

impl<S> StoreAuditSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: WorkspaceStore> AuditSink for StoreAuditSink<S> {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), AuditSinkError> {
        self.store.append_audit(entry).await.map_err(AuditSinkError::from)
    }
}

enum QueueItem {
    Entry(AuditLogEntry),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
enum Delivery {
    Queued(mpsc::UnboundedSender<QueueItem>),
    Inline(Arc<dyn AuditSink>),
}

/// Fire-and-forget recorder with two delivery modes.
///
/// - `queued`: entries go onto an unbounded channel drained by a background
///   task; `record` returns without waiting on the sink.
/// - `inline`: the sink is awaited in place with its error suppressed, which
///   keeps tests deterministic.
#[derive(Clone)]
pub struct AuditRecorder {
    delivery: Delivery,
}

impl AuditRecorder {
    /// Spawn the drain task. Must be called inside a tokio runtime.
    pub fn queued(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::drain(rx, sink));
        Self { delivery: Delivery::Queued(tx) }
    }

    pub fn inline(sink: Arc<dyn AuditSink>) -> Self {
        Self { delivery: Delivery::Inline(sink) }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<QueueItem>, sink: Arc<dyn AuditSink>) {
        while let Some(item) = rx.recv().await {
            match item {
                QueueItem::Entry(entry) => deliver(sink.as_ref(), entry).await,
                QueueItem::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    pub async fn record(
        &self,
        tenant_id: Option<TenantId>,
        actor_id: UserId,
        action: AuditAction,
        entity_type: EntityType,
        entity_id: impl Into<Uuid>,
    ) {
        let entry = AuditLogEntry::new(tenant_id, actor_id, action, entity_type, entity_id, Utc::now());
        match &self.delivery {
            Delivery::Queued(tx) => {
                if tx.send(QueueItem::Entry(entry)).is_err() {
                    tracing::error!(
                        target: "workhive::audit",
                        action = action.as_str(),
                        "audit queue closed; entry dropped"
                    );
                }
            }
            Delivery::Inline(sink) => deliver(sink.as_ref(), entry).await,
        }
    }

    /// Wait until every entry recorded before this call has been handed to
    /// the sink. Immediate for inline delivery.
    pub async fn flush(&self) {
        if let Delivery::Queued(tx) = &self.delivery {
            let (done_tx, done_rx) = oneshot::channel();
            if tx.send(QueueItem::Flush(done_tx)).is_ok() {
                let _ = done_rx.await;
            }
        }
    }
}

async fn deliver(sink: &dyn AuditSink, entry: AuditLogEntry) {
    let action = entry.action;
    let entity_id = entry.entity_id;
    if let Err(e) = sink.append(entry).await {
        tracing::error!(
            target: "workhive::audit",
            action = action.as_str(),
            entity_id = %entity_id,
            error = %e,
            "failed to record audit entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        entries: Mutex<Vec<AuditLogEntry>>,
    }

    #[async_trait]
    impl AuditSink for CollectingSink {
        async fn append(&self, entry: AuditLogEntry) -> Result<(), AuditSinkError> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn append(&self, _entry: AuditLogEntry) -> Result<(), AuditSinkError> {
            Err(AuditSinkError("disk full".into()))
        }
    }

    #[tokio::test]
    async fn queued_entries_reach_the_sink_in_order() {
        let sink = Arc::new(CollectingSink::default());
        let recorder = AuditRecorder::queued(sink.clone());
        let actor = UserId::new();

        for action in [AuditAction::CreateProject, AuditAction::UpdateProject, AuditAction::DeleteProject] {
            recorder.record(None, actor, action, EntityType::Project, Uuid::now_v7()).await;
        }
        recorder.flush().await;

        let actions: Vec<_> = sink.entries.lock().unwrap().iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::CreateProject, AuditAction::UpdateProject, AuditAction::DeleteProject]
        );
    }

    #[tokio::test]
    async fn failing_sink_is_swallowed_in_both_modes() {
        let inline = AuditRecorder::inline(Arc::new(FailingSink));
        inline.record(None, UserId::new(), AuditAction::Login, EntityType::User, Uuid::now_v7()).await;

        let queued = AuditRecorder::queued(Arc::new(FailingSink));
        queued.record(None, UserId::new(), AuditAction::Login, EntityType::User, Uuid::now_v7()).await;
        queued.flush().await;
    }
}
