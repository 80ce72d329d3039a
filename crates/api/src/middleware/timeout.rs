//! JSON body for requests cut off by the timeout layer.
//!
//! `tower_http::timeout::TimeoutLayer` answers with a bare `408` and an empty
//! body. Handlers never produce `408` themselves, so any such response came
//! from the layer and is replaced with [`AppError::Timeout`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Replace the timeout layer's empty `408` with the JSON error body.
pub async fn timeout_error_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}
