use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
};
use serde_json::json;

use workhive_auth::SessionContext;
use workhive_core::{ProjectId, TaskId};

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(project_id): Path<String>,
    ApiJson(body): ApiJson<dto::CreateTaskRequest>,
) -> axum::response::Response {
    let project_id = match errors::parse_id::<ProjectId>(&project_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.create_task(&session, project_id, body.into()).await {
        Ok(task) => errors::ok(StatusCode::CREATED, task),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(project_id): Path<String>,
    Query(query): Query<dto::TaskListQuery>,
) -> axum::response::Response {
    let project_id = match errors::parse_id::<ProjectId>(&project_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (filter, page) = query.split();
    match services.list_tasks(&session, project_id, &filter, page).await {
        Ok(tasks) => errors::ok(StatusCode::OK, tasks),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_task_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateTaskStatusRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id::<TaskId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.update_task_status(&session, id, body.status).await {
        Ok(task) => errors::ok(StatusCode::OK, task),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateTaskRequest>,
) -> axum::response::Response {
    let id = match errors::parse_id::<TaskId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.update_task(&session, id, body.into()).await {
        Ok(task) => errors::ok(StatusCode::OK, task),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<TaskId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.delete_task(&session, id).await {
        Ok(()) => errors::ok(StatusCode::OK, json!({ "id": id })),
        Err(e) => errors::service_error_to_response(e),
    }
}
