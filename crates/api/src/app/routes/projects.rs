use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
};
use serde_json::json;

use workhive_auth::SessionContext;
use workhive_core::ProjectId;

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub async fn create_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    ApiJson(body): ApiJson<dto::CreateProjectRequest>,
) -> axum::response::Response {
    match services.create_project(&session, body.into()).await {
        Ok(project) => errors::ok(StatusCode::CREATED, project),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_projects(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<dto::ProjectListQuery>,
) -> axum::response::Response {
    let (filter, page) = query.split();
    match services.list_projects(&session, &filter, page).await {
        Ok(projects) => errors::ok(StatusCode::OK, projects),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateProjectRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id::<ProjectId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.update_project(&session, id, body.into()).await {
        Ok(project) => errors::ok(StatusCode::OK, project),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_project(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<ProjectId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.delete_project(&session, id).await {
        Ok(()) => errors::ok(StatusCode::OK, json!({ "id": id })),
        Err(e) => errors::service_error_to_response(e),
    }
}
