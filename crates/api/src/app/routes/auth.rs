use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode};
use serde_json::json;

use workhive_auth::SessionContext;

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub async fn register_tenant(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::RegisterTenantRequest>,
) -> axum::response::Response {
    match services.register_tenant(body.into()).await {
        Ok(reg) => errors::ok(StatusCode::CREATED, reg),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::LoginBody>,
) -> axum::response::Response {
    match services.login(body.into()).await {
        Ok(outcome) => errors::ok(
            StatusCode::OK,
            json!({
                "token": outcome.token.token,
                "expiresIn": outcome.token.expires_in,
                "user": outcome.user,
                "tenant": outcome.tenant,
            }),
        ),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.current_user(&session).await {
        Ok(profile) => errors::ok(StatusCode::OK, profile),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    match services.logout(&session).await {
        Ok(()) => errors::ok(StatusCode::OK, json!({ "message": "logged out" })),
        Err(e) => errors::service_error_to_response(e),
    }
}
