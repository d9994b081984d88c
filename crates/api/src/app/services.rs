//! Store, credential and audit wiring behind the HTTP handlers.

use std::sync::Arc;

use anyhow::Context;

use workhive_auth::{CredentialVerifier, Credentials};
use workhive_infra::{
    AuditRecorder, InMemoryWorkspaceStore, PostgresWorkspaceStore, StoreAuditSink,
    WorkspaceServices, WorkspaceStore,
};

use crate::config::ApiConfig;

pub type AppStore = Arc<dyn WorkspaceStore>;

/// Resource services as seen by the handlers.
pub type AppServices = WorkspaceServices<AppStore>;

/// Build the services for `config`: Postgres when a database URL is
/// configured, in-memory otherwise. Must run inside a tokio runtime.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store: AppStore = match &config.database_url {
        Some(url) => {
            let pg = PostgresWorkspaceStore::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            tracing::info!("using postgres workspace store");
            Arc::new(pg)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory workspace store");
            Arc::new(InMemoryWorkspaceStore::new())
        }
    };

    let credentials: Arc<dyn CredentialVerifier> =
        Arc::new(Credentials::new(&config.jwt_secret, config.jwt_ttl_secs));
    let audit = AuditRecorder::queued(Arc::new(StoreAuditSink::new(store.clone())));
    let services = WorkspaceServices::new(store, credentials, audit);

    if let Some(seed) = &config.super_admin {
        let created = services
            .bootstrap_super_admin(&seed.email, &seed.password, &seed.full_name)
            .await
            .context("failed to bootstrap super_admin account")?;
        if created {
            tracing::info!(email = %seed.email, "super_admin account created");
        }
    }

    Ok(services)
}
