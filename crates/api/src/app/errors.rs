use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use workhive_core::DomainError;
use workhive_infra::{ErrorKind, ServiceError};

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// `{ "success": true, "data": ... }`
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> axum::response::Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Denied | ErrorKind::LimitReached => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = json!({
        "success": false,
        "error": kind.as_str(),
        "message": err.to_string(),
    });
    if let ServiceError::Denied(reason) = &err {
        body["reason"] = json!(reason.as_str());
    }
    (status, Json(body)).into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path identifier, answering 400 on malformed input.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "validation_error", e.message()))
}
