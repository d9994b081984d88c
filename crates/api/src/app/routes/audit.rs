use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
};

use workhive_auth::SessionContext;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::AuditListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.list_audit_logs(&session, &filter, page).await {
        Ok(entries) => errors::ok(StatusCode::OK, entries),
        Err(e) => errors::service_error_to_response(e),
    }
}
