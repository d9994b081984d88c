use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
};
use serde_json::json;

use workhive_auth::SessionContext;
use workhive_core::{TenantId, UserId};

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub async fn add_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(tenant_id): Path<String>,
    ApiJson(body): ApiJson<dto::CreateUserRequest>,
) -> axum::response::Response {
    let tenant_id = match errors::parse_id::<TenantId>(&tenant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.add_user(&session, tenant_id, body.into()).await {
        Ok(user) => errors::ok(StatusCode::CREATED, user),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_tenant_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(tenant_id): Path<String>,
    Query(query): Query<dto::UserListQuery>,
) -> axum::response::Response {
    let tenant_id = match errors::parse_id::<TenantId>(&tenant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (filter, page) = query.split();
    match services.list_users(&session, Some(tenant_id), &filter, page).await {
        Ok(users) => errors::ok(StatusCode::OK, users),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Users visible to the session: its own tenant, or every tenant for super_admin.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::UserListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.list_users(&session, None, &filter, page).await {
        Ok(users) => errors::ok(StatusCode::OK, users),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.update_user(&session, id, body.into()).await {
        Ok(user) => errors::ok(StatusCode::OK, user),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.delete_user(&session, id).await {
        Ok(()) => errors::ok(StatusCode::OK, json!({ "id": id })),
        Err(e) => errors::service_error_to_response(e),
    }
}
