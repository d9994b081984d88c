use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
};

use workhive_auth::SessionContext;
use workhive_core::TenantId;

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub async fn list_tenants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::TenantListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.list_tenants(&session, &filter, page).await {
        Ok(tenants) => errors::ok(StatusCode::OK, tenants),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<TenantId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.get_tenant(&session, id).await {
        Ok(details) => errors::ok(StatusCode::OK, details),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateTenantRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id::<TenantId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.update_tenant(&session, id, body.into()).await {
        Ok(tenant) => errors::ok(StatusCode::OK, tenant),
        Err(e) => errors::service_error_to_response(e),
    }
}
