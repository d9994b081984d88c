//! Request extractors that answer failures with the error envelope.

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::app::errors;

/// `Json<T>` whose rejections (bad syntax, wrong shape, missing content
/// type) become `400 validation_error` envelopes.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection_to_response(rejection)),
        }
    }
}

fn rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "rejected request body");
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}
